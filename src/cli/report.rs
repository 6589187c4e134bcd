use std::cell::RefCell;
use std::rc::Rc;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{date_filter, Context};
use crate::error::Result;
use crate::fmt::money;
use crate::models::PLACEHOLDER;
use crate::reports::{ReportStats, ReportView, TRANSACTIONS_COLLECTION};
use crate::subscription::Subscription;

/// A report view fed live from the transactions collection, with the
/// requested filter applied.
pub(crate) fn open_view(
    ctx: &Context,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<(Rc<RefCell<ReportView>>, Subscription)> {
    let filter = date_filter(from_date, to_date)?;
    let view = Rc::new(RefCell::new(ReportView::new(ctx.zone, ctx.settings.page_size)));
    let subscription = ReportView::attach(&view, &*ctx.store, TRANSACTIONS_COLLECTION);
    let fetch_error = view.borrow().error();
    if let Some(err) = fetch_error {
        return Err(err);
    }
    if filter.is_open() {
        view.borrow_mut().reset_filters();
    } else {
        view.borrow_mut().set_filter(filter);
    }
    Ok((view, subscription))
}

pub(crate) fn stats_table(stats: &ReportStats) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Summary", ""]);
    table.add_row(vec![Cell::new("Total fare".bold()), Cell::new(money(stats.total_fare))]);
    table.add_row(vec![Cell::new("Tickets sold"), Cell::new(stats.total_tickets)]);
    table.add_row(vec![
        Cell::new("Cash"),
        Cell::new(format!("{} ({})", money(stats.cash_amount), stats.cash_payments)),
    ]);
    table.add_row(vec![
        Cell::new("Card"),
        Cell::new(format!("{} ({})", money(stats.card_amount), stats.card_payments)),
    ]);
    if stats.other_payments() > 0 {
        table.add_row(vec![Cell::new("Other methods"), Cell::new(stats.other_payments())]);
    }
    table.add_row(vec![
        Cell::new("Voided".red()),
        Cell::new(stats.voided_tickets),
    ]);
    table
}

pub fn run(from_date: Option<String>, to_date: Option<String>, page: usize) -> Result<()> {
    let ctx = Context::open()?;
    let (view, mut subscription) = open_view(&ctx, from_date.as_deref(), to_date.as_deref())?;
    let mut view = view.borrow_mut();
    view.set_page(page);

    println!("Transaction Overview ({})", view.filter().label());
    println!("{}", stats_table(&view.stats()));

    let rows = view.current_page();
    if rows.is_empty() {
        println!("No transactions found.");
    } else {
        let mut table = Table::new();
        table.set_header(vec![
            "Date", "Fare", "Payment", "Pick-up", "Drop-off", "Driver", "Invoice", "Status",
        ]);
        for r in &rows {
            let date = r
                .timestamp
                .map(|t| ctx.zone.date_of(t).format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            let status = if r.is_voided {
                r.status_label().red()
            } else {
                r.status_label().green()
            };
            table.add_row(vec![
                Cell::new(date),
                Cell::new(money(r.fare_price)),
                Cell::new(r.payment_method.label()),
                Cell::new(r.pick_up_or_placeholder()),
                Cell::new(r.drop_off_or_placeholder()),
                Cell::new(r.driver_or_placeholder()),
                Cell::new(r.invoice_or_placeholder()),
                Cell::new(status),
            ]);
        }
        println!("{table}");
    }
    println!("Page {} of {}", view.page(), view.page_count());

    subscription.unsubscribe();
    Ok(())
}
