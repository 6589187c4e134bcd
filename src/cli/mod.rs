pub mod backup;
pub mod export;
pub mod import;
pub mod init;
pub mod login;
pub mod logs;
pub mod maintenance;
pub mod report;
pub mod resets;
pub mod status;
pub mod users;

use std::rc::Rc;

use clap::{Parser, Subcommand};
use zeroize::Zeroize;

use crate::dates::{parse_date, BoundaryZone};
use crate::db;
use crate::error::{FleetError, Result};
use crate::reports::ReportFilter;
use crate::settings::{load_settings, Settings};
use crate::store::SqliteStore;

/// Password source for non-interactive use; the terminal prompt is used otherwise.
pub const PASSWORD_ENV: &str = "FLEETDESK_PASSWORD";

#[derive(Parser)]
#[command(
    name = "fleetdesk",
    version,
    about = "Back-office reports and role-gated access for a transport fleet."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for fleetdesk data (default: ~/Documents/fleetdesk)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Organization name printed on exports
        #[arg(long)]
        organization: Option<String>,
        /// UTC offset for calendar dates, e.g. +08:00 (default: local zone)
        #[arg(long = "utc-offset")]
        utc_offset: Option<String>,
        /// Rows per report page
        #[arg(long = "page-size")]
        page_size: Option<usize>,
    },
    /// Import documents from a JSON file.
    Import {
        /// JSON file: an array of documents or an object keyed by document id
        file: String,
        /// Target collection
        #[arg(long, default_value = "transactions")]
        collection: String,
    },
    /// Show the transaction report for a date range.
    Report {
        /// First day, YYYY-MM-DD (inclusive)
        #[arg(long = "from")]
        from_date: Option<String>,
        /// Last day, YYYY-MM-DD (inclusive)
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Page to show (1-based)
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Export the filtered transaction list.
    Export {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        /// csv or pdf
        #[arg(long, default_value = "csv")]
        format: String,
        /// Output file path
        #[arg(long)]
        output: Option<String>,
    },
    /// Show the staff activity log.
    Logs {
        /// Match against user and activity text
        #[arg(long)]
        search: Option<String>,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Triage password reset requests.
    Resets {
        #[command(subcommand)]
        command: ResetsCommands,
    },
    /// Show or change maintenance mode.
    Maintenance {
        #[command(subcommand)]
        command: MaintenanceCommands,
    },
    /// Manage staff accounts.
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Sign in and print where the account lands.
    Login {
        email: String,
        /// Check access to this path instead of the landing page
        #[arg(long)]
        route: Option<String>,
    },
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/fleetdesk-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show current database and summary counts.
    Status,
}

#[derive(Subcommand)]
pub enum ResetsCommands {
    /// List pending requests, oldest first.
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Approve a request and send the reset mail.
    Approve {
        /// Request ID (shown in `fleetdesk resets list`)
        id: String,
        /// Mail recipient (default: the requesting user)
        email: Option<String>,
    },
    /// Decline and remove a request.
    Decline { id: String },
}

#[derive(Subcommand)]
pub enum MaintenanceCommands {
    /// Show the current system status.
    Show,
    /// Switch between operational and maintenance mode.
    Set {
        /// operational or maintenance
        mode: String,
        /// Message shown to staff
        #[arg(long, default_value = "")]
        message: String,
    },
}

#[derive(Subcommand)]
pub enum UsersCommands {
    /// Register an account and its staff profile.
    Add {
        email: String,
        /// Admin, Cashier, Super, Driver, Reliever, Inspector or Conductor
        #[arg(long)]
        role: String,
        /// Display name on the profile
        #[arg(long)]
        name: Option<String>,
    },
    /// List staff profiles.
    List,
}

/// Settings, zone and an open store, as every data command needs them.
pub(crate) struct Context {
    pub settings: Settings,
    pub zone: BoundaryZone,
    pub store: Rc<SqliteStore>,
}

impl Context {
    pub fn open() -> Result<Self> {
        let settings = load_settings();
        let zone = settings.zone()?;
        let conn = db::open(&settings.db_path())?;
        Ok(Self {
            settings,
            zone,
            store: Rc::new(SqliteStore::new(conn)),
        })
    }
}

pub(crate) fn date_filter(from: Option<&str>, to: Option<&str>) -> Result<ReportFilter> {
    let start = from.map(|s| parse_date(s, "from")).transpose()?;
    let end = to.map(|s| parse_date(s, "to")).transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(FleetError::Validation {
                field: "to",
                message: format!("{e} is before {s}"),
            });
        }
    }
    Ok(ReportFilter::new(start, end))
}

/// Read a password from the environment or the terminal. The caller owns the
/// returned buffer and should zeroize it when done.
pub(crate) fn read_password(prompt: &str) -> Result<String> {
    if let Ok(mut from_env) = std::env::var(PASSWORD_ENV) {
        let password = from_env.trim_end_matches(['\r', '\n']).to_string();
        from_env.zeroize();
        return Ok(password);
    }
    Ok(rpassword::prompt_password(prompt)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_filter() {
        let f = date_filter(Some("2024-01-01"), None).unwrap();
        assert!(f.start_date.is_some());
        assert!(f.end_date.is_none());
        assert!(date_filter(None, None).unwrap().is_open());
        assert!(date_filter(Some("2024-02-01"), Some("2024-01-01")).is_err());
        assert!(date_filter(Some("01/02/2024"), None).is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
