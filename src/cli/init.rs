use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::{FleetError, Result};
use crate::settings::{load_settings, parse_offset, save_settings, shellexpand_path};

pub fn run(
    data_dir: Option<String>,
    organization: Option<String>,
    utc_offset: Option<String>,
    page_size: Option<usize>,
) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(name) = organization {
        settings.organization_name = name.trim().to_string();
    }
    if let Some(offset) = utc_offset {
        parse_offset(&offset)?;
        settings.utc_offset = Some(offset.trim().to_string());
    }
    if let Some(size) = page_size {
        if size == 0 {
            return Err(FleetError::Validation {
                field: "page-size",
                message: "must be at least 1".to_string(),
            });
        }
        settings.page_size = size;
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("exports"))?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    println!("Initialized fleetdesk at {}", resolved.display());
    Ok(())
}
