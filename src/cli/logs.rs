use comfy_table::{Cell, Table};

use crate::activity::{filter_logs, normalize_logs, visible_logs, LOGS_COLLECTION};
use crate::cli::{date_filter, Context};
use crate::error::Result;
use crate::store::DocumentStore;

pub fn run(search: Option<String>, from_date: Option<String>, to_date: Option<String>) -> Result<()> {
    let ctx = Context::open()?;
    let filter = date_filter(from_date.as_deref(), to_date.as_deref())?;
    let docs = ctx.store.list_collection(LOGS_COLLECTION)?;
    let entries = visible_logs(normalize_logs(&docs, ctx.zone));
    let entries = filter_logs(&entries, search.as_deref().unwrap_or(""), &filter, ctx.zone);

    if entries.is_empty() {
        println!("No activity found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["When", "User", "Role", "Activity"]);
    for e in &entries {
        let when = e
            .timestamp
            .map(|t| ctx.zone.format_instant(t, "%Y-%m-%d %H:%M"))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(when),
            Cell::new(&e.performed_by),
            Cell::new(&e.role),
            Cell::new(&e.activity),
        ]);
    }
    println!("{table}");
    println!("{} entries", entries.len());
    Ok(())
}
