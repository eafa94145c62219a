//! DateTime helpers.
//!
//! All timestamps written by the data-access layer come from [`now_utc`];
//! soft-delete stamping goes through this module.

use chrono::{DateTime, Utc};

/// Current UTC time.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as RFC 3339.
pub fn format_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339()
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_datetime(datetime_str: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(datetime_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Failed to parse datetime '{}': {}", datetime_str, e))
}
