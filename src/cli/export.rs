use std::path::PathBuf;

use crate::cli::report::open_view;
use crate::cli::Context;
use crate::error::Result;
use crate::export::{ExportFormat, ExportMeta};

fn default_path(data_dir: &str, extension: &str) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    PathBuf::from(data_dir)
        .join("exports")
        .join(format!("transactions-{date}.{extension}"))
}

fn write_file(bytes: &[u8], path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn run(
    from_date: Option<String>,
    to_date: Option<String>,
    format: &str,
    output: Option<String>,
) -> Result<()> {
    let format = ExportFormat::parse(format)?;
    let ctx = Context::open()?;
    let (view, mut subscription) = open_view(&ctx, from_date.as_deref(), to_date.as_deref())?;

    let (meta, rows) = {
        let view = view.borrow();
        let meta = ExportMeta {
            title: "Transaction Overview".to_string(),
            organization: ctx.settings.organization_name.clone(),
            date_range: view.filter().label(),
            stats: Some(view.stats()),
        };
        (meta, view.export_rows())
    };
    subscription.unsubscribe();

    let exporter = format.exporter();
    let bytes = exporter.export(&meta, &rows)?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path(&ctx.settings.data_dir, exporter.extension()));
    write_file(&bytes, &path)?;
    println!("{} rows exported", rows.len());
    Ok(())
}
