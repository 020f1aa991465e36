//! Timestamp formatting for audit lines and archive collision suffixes.

use chrono::{DateTime, Local, TimeZone};

/// Format used at the start of every audit log line.
const LOG_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Suffix appended to an archive target whose base name is already taken.
const COLLISION_FORMAT: &str = "_%Y%m%d-%H%M%S";

/// Human-readable timestamp for an audit log line.
pub fn log_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(LOG_FORMAT).to_string()
}

/// `_YYYYMMDD-HHMMSS` suffix for a relocated directory.
pub fn collision_suffix<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(COLLISION_FORMAT).to_string()
}

/// Current local time, the clock every run is stamped with.
pub fn now() -> DateTime<Local> {
    Local::now()
}
