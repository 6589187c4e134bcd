use comfy_table::{Cell, Table};

use crate::activity;
use crate::auth::LocalAuth;
use crate::cli::Context;
use crate::error::{FleetError, Result};
use crate::resets::{pending_requests, search_requests, Approval, ResetDesk, ResetRequest, RESETS_COLLECTION};
use crate::store::DocumentStore;

const HANDLER_ROLE: &str = "Super";

pub fn list(search: Option<String>) -> Result<()> {
    let ctx = Context::open()?;
    let docs = ctx.store.list_collection(RESETS_COLLECTION)?;
    let pending = pending_requests(&docs, ctx.zone);
    let pending = search_requests(&pending, search.as_deref().unwrap_or(""));

    if pending.is_empty() {
        println!("No pending requests.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "User", "Role", "Requested", "Status"]);
    for r in &pending {
        let requested = r
            .requested_at
            .map(|t| ctx.zone.format_instant(t, "%Y-%m-%d %H:%M"))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&r.id),
            Cell::new(&r.user),
            Cell::new(if r.role.is_empty() { "-" } else { r.role.as_str() }),
            Cell::new(requested),
            Cell::new(&r.status),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn find(ctx: &Context, id: &str) -> Result<ResetRequest> {
    ctx.store
        .get_document(RESETS_COLLECTION, id)?
        .map(|doc| ResetRequest::from_document(&doc, ctx.zone))
        .ok_or_else(|| FleetError::NotFound(format!("reset request {id}")))
}

pub fn approve(id: &str, email: Option<String>) -> Result<()> {
    let ctx = Context::open()?;
    let request = find(&ctx, id)?;
    let email = email.unwrap_or_else(|| request.user.clone());
    if email.trim().is_empty() {
        return Err(FleetError::Validation {
            field: "email",
            message: format!("request {id} names no user; pass the email explicitly"),
        });
    }

    let auth = LocalAuth::new(ctx.store.clone());
    let approval = ResetDesk::new(&*ctx.store, &auth).approve(id, &email)?;
    activity::record(
        &*ctx.store,
        "Super Admin",
        HANDLER_ROLE,
        &format!("Approved password reset for {email}"),
    )?;
    match approval {
        Approval::Mailed => {
            println!("Approved {id}; reset mail sent to {email}.");
            Ok(())
        }
        Approval::MailFailed(e) => {
            println!("Approved {id}, but the reset mail could not be sent.");
            Err(e)
        }
    }
}

pub fn decline(id: &str) -> Result<()> {
    let ctx = Context::open()?;
    let request = find(&ctx, id)?;
    let auth = LocalAuth::new(ctx.store.clone());
    ResetDesk::new(&*ctx.store, &auth).decline(id)?;
    activity::record(
        &*ctx.store,
        "Super Admin",
        HANDLER_ROLE,
        &format!("Declined password reset for {}", request.user),
    )?;
    println!("Declined and removed {id}.");
    Ok(())
}
