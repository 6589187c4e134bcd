use comfy_table::{Cell, Table};
use serde_json::json;
use zeroize::Zeroize;

use crate::auth::LocalAuth;
use crate::cli::{read_password, Context};
use crate::error::{FleetError, Result};
use crate::roles::{Role, USERS_COLLECTION};
use crate::store::{fields, DocumentStore};

pub fn add(email: &str, role: &str, name: Option<String>) -> Result<()> {
    let role = Role::parse(role);
    if !role.is_recognized() {
        let known = Role::KNOWN.iter().map(Role::as_str).collect::<Vec<_>>().join(", ");
        return Err(FleetError::Validation {
            field: "role",
            message: format!("'{role}' is not one of {known}"),
        });
    }

    let ctx = Context::open()?;
    let auth = LocalAuth::new(ctx.store.clone());

    let mut password = read_password("Password: ")?;
    let registered = auth.register(email, &password);
    password.zeroize();
    let principal = registered?;

    ctx.store.write_document(
        USERS_COLLECTION,
        &principal.uid,
        fields(json!({
            "email": principal.email,
            "role": role.as_str(),
            "name": name.unwrap_or_default(),
            "createdAt": chrono::Utc::now().to_rfc3339(),
        })),
        false,
    )?;

    println!("Added {} as {role}", principal.email);
    Ok(())
}

pub fn list() -> Result<()> {
    let ctx = Context::open()?;
    let profiles = ctx.store.list_collection(USERS_COLLECTION)?;
    if profiles.is_empty() {
        println!("No users. Add one with `fleetdesk users add`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Email", "Name", "Role"]);
    for p in &profiles {
        table.add_row(vec![
            Cell::new(p.str_field("email").unwrap_or("-")),
            Cell::new(p.str_field("name").unwrap_or("")),
            Cell::new(p.str_field("role").unwrap_or("-")),
        ]);
    }
    println!("{table}");
    Ok(())
}
