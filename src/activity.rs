use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

use crate::dates::{parse_instant, BoundaryZone};
use crate::error::Result;
use crate::reports::ReportFilter;
use crate::store::{fields, Document, DocumentStore};

pub const LOGS_COLLECTION: &str = "systemLogs";

const UNKNOWN_USER: &str = "Unknown User";
const NO_ACTIVITY: &str = "No activity description";
const UNKNOWN_ROLE: &str = "Unknown Role";

/// One line of the staff activity log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub performed_by: String,
    pub activity: String,
    pub role: String,
}

pub fn normalize_log(id: &str, raw: &Value, zone: BoundaryZone) -> LogEntry {
    let text = |key: &str, default: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    LogEntry {
        id: id.to_string(),
        timestamp: raw.get("timestamp").and_then(|v| parse_instant(v, zone)),
        performed_by: text("performedBy", UNKNOWN_USER),
        activity: text("activity", NO_ACTIVITY),
        role: text("role", UNKNOWN_ROLE),
    }
}

/// Normalize a snapshot, newest first.
pub fn normalize_logs(docs: &[Document], zone: BoundaryZone) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = docs
        .iter()
        .map(|d| normalize_log(&d.id, &Value::Object(d.fields.clone()), zone))
        .collect();
    entries.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    entries
}

/// Append an entry stamped with the current time.
pub fn record<S>(store: &S, performed_by: &str, role: &str, activity: &str) -> Result<String>
where
    S: DocumentStore + ?Sized,
{
    store.insert_document(
        LOGS_COLLECTION,
        fields(json!({
            "timestamp": Utc::now().to_rfc3339(),
            "performedBy": performed_by,
            "role": role,
            "activity": activity,
        })),
    )
}

/// Super-role activity is never shown.
pub fn visible_logs(entries: Vec<LogEntry>) -> Vec<LogEntry> {
    entries
        .into_iter()
        .filter(|e| !e.role.trim().eq_ignore_ascii_case("super"))
        .collect()
}

/// Free-text search over user and activity, plus a calendar-date window that
/// applies only once both ends are chosen.
pub fn filter_logs(
    entries: &[LogEntry],
    search: &str,
    filter: &ReportFilter,
    zone: BoundaryZone,
) -> Vec<LogEntry> {
    let needle = search.trim().to_lowercase();
    let window = filter.start_date.zip(filter.end_date);
    let kept: Vec<LogEntry> = entries
        .iter()
        .filter(|e| {
            needle.is_empty()
                || format!("{} {}", e.performed_by, e.activity)
                    .to_lowercase()
                    .contains(&needle)
        })
        .filter(|e| match window {
            None => true,
            Some((start, end)) => e
                .timestamp
                .map(|ts| zone.date_of(ts))
                .is_some_and(|d| d >= start && d <= end),
        })
        .cloned()
        .collect();
    debug!(total = entries.len(), kept = kept.len(), "activity log filtered");
    kept
}
