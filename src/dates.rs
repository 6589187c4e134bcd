use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use serde_json::Value;

use crate::error::{FleetError, Result};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// The zone used to read calendar dates and timestamps that carry no offset.
///
/// Filter boundaries and naive ingested timestamps always go through the same
/// zone, so a record written as `2024-01-10T23:59:00` falls on 2024-01-10 no
/// matter which zone the application is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryZone {
    Local,
    Fixed(FixedOffset),
}

impl BoundaryZone {
    pub fn utc() -> Self {
        BoundaryZone::Fixed(Utc.fix())
    }

    /// Interpret a wall-clock time in this zone.
    pub fn localize(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        match self {
            BoundaryZone::Fixed(offset) => match offset.from_local_datetime(&naive).single() {
                Some(dt) => dt.with_timezone(&Utc),
                None => Utc.from_utc_datetime(&naive),
            },
            // A wall time skipped by a DST jump has no local instant; read it as UTC.
            BoundaryZone::Local => match Local.from_local_datetime(&naive).earliest() {
                Some(dt) => dt.with_timezone(&Utc),
                None => Utc.from_utc_datetime(&naive),
            },
        }
    }

    /// Calendar date of an instant as seen in this zone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            BoundaryZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
            BoundaryZone::Local => instant.with_timezone(&Local).date_naive(),
        }
    }

    /// Render an instant as wall-clock time in this zone.
    pub fn format_instant(&self, instant: DateTime<Utc>, fmt: &str) -> String {
        match self {
            BoundaryZone::Fixed(offset) => instant.with_timezone(offset).format(fmt).to_string(),
            BoundaryZone::Local => instant.with_timezone(&Local).format(fmt).to_string(),
        }
    }

    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.localize(date.and_time(NaiveTime::MIN))
    }

    /// 23:59:59.999 on `date`.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.localize(date.and_time(NaiveTime::MIN) + Duration::milliseconds(86_399_999))
    }
}

/// Normalize the timestamp shapes the store hands back into one instant.
///
/// Accepts store timestamp objects (`seconds`/`nanoseconds`, with or without a
/// leading underscore), RFC 3339 strings, naive date-times and bare dates (read
/// in `zone`), and epoch milliseconds. Anything else yields `None`.
pub fn parse_instant(value: &Value, zone: BoundaryZone) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => {
            let secs = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(secs, u32::try_from(nanos).ok()?).single()
        }
        Value::String(s) => parse_instant_str(s, zone),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

pub fn parse_instant_str(raw: &str, zone: BoundaryZone) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(zone.localize(naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| zone.start_of_day(d))
}

/// Parse a `YYYY-MM-DD` argument.
pub fn parse_date(raw: &str, field: &'static str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| FleetError::Validation {
        field,
        message: format!("'{raw}' is not a YYYY-MM-DD date"),
    })
}
