use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use crate::dates::{parse_instant, BoundaryZone};
use crate::error::{FleetError, Result};
use crate::store::{fields, DocumentStore};

pub const SYSTEM_COLLECTION: &str = "system";
pub const STATUS_DOCUMENT: &str = "Status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Operational,
    Maintenance,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Operational => "Operational Mode",
            Mode::Maintenance => "Maintenance Mode",
        }
    }

    /// Accepts the stored labels as well as the short CLI names.
    pub fn parse(raw: &str) -> Result<Mode> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "operational" | "operational mode" => Ok(Mode::Operational),
            "maintenance" | "maintenance mode" => Ok(Mode::Maintenance),
            other => Err(FleetError::Validation {
                field: "mode",
                message: format!("unknown mode '{other}' (expected operational or maintenance)"),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    pub mode: Mode,
    pub message: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            mode: Mode::Operational,
            message: String::new(),
            updated_at: None,
        }
    }
}

/// Current status. A missing document, or one with a status we do not know,
/// reads as operational.
pub fn read_status<S>(store: &S, zone: BoundaryZone) -> Result<SystemStatus>
where
    S: DocumentStore + ?Sized,
{
    let Some(doc) = store.get_document(SYSTEM_COLLECTION, STATUS_DOCUMENT)? else {
        return Ok(SystemStatus::default());
    };
    let mode = doc
        .str_field("status")
        .and_then(|s| Mode::parse(s).ok())
        .unwrap_or(Mode::Operational);
    Ok(SystemStatus {
        mode,
        message: doc.str_field("message").unwrap_or_default().to_string(),
        updated_at: doc.fields.get("timestamp").and_then(|v| parse_instant(v, zone)),
    })
}

pub fn set_status<S>(store: &S, mode: Mode, message: &str) -> Result<()>
where
    S: DocumentStore + ?Sized,
{
    store.write_document(
        SYSTEM_COLLECTION,
        STATUS_DOCUMENT,
        fields(json!({
            "status": mode.label(),
            "message": message.trim(),
            "timestamp": Utc::now().to_rfc3339(),
        })),
        true,
    )?;
    info!(mode = mode.label(), "system status updated");
    Ok(())
}
