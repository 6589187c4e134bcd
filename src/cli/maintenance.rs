use colored::Colorize;

use crate::activity;
use crate::cli::Context;
use crate::error::Result;
use crate::maintenance::{read_status, set_status, Mode};

pub fn show() -> Result<()> {
    let ctx = Context::open()?;
    let status = read_status(&*ctx.store, ctx.zone)?;
    let label = match status.mode {
        Mode::Operational => status.mode.label().green().bold(),
        Mode::Maintenance => status.mode.label().yellow().bold(),
    };
    println!("Status:   {label}");
    if !status.message.is_empty() {
        println!("Message:  {}", status.message);
    }
    if let Some(t) = status.updated_at {
        println!("Updated:  {}", ctx.zone.format_instant(t, "%Y-%m-%d %H:%M"));
    }
    Ok(())
}

pub fn set(mode: &str, message: &str) -> Result<()> {
    let mode = Mode::parse(mode)?;
    let ctx = Context::open()?;
    set_status(&*ctx.store, mode, message)?;
    activity::record(
        &*ctx.store,
        "Super Admin",
        "Super",
        &format!("Set system status to {mode}"),
    )?;
    println!("The system status is set as {mode}");
    Ok(())
}
