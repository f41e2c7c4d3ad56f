//! Timestamp handling for NF-e date fields.
//!
//! Version 3 and later documents carry offset-aware timestamps
//! (`2019-05-10T10:30:00-03:00`). Version 2 documents carry a bare date
//! (`dEmi`, `dSaiEnt`) and a separate time (`hSaiEnt`).

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveTime};

/// Split an RFC 3339 timestamp into rendered date and time, keeping the
/// wall-clock time of the document's own offset.
pub fn split_timestamp(text: &str, date_format: &str, time_format: &str) -> Option<(String, String)> {
    let timestamp = DateTime::parse_from_rfc3339(text.trim()).ok()?;
    Some((
        render(timestamp.format(date_format))?,
        render(timestamp.format(time_format))?,
    ))
}

/// Re-render a `YYYY-MM-DD` date.
pub fn format_date(text: &str, date_format: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()?;
    render(date.format(date_format))
}

/// Re-render a `HH:MM:SS` time.
pub fn format_time(text: &str, time_format: &str) -> Option<String> {
    let time = NaiveTime::parse_from_str(text.trim(), "%H:%M:%S").ok()?;
    render(time.format(time_format))
}

/// Whether `format` only holds valid `chrono` specifiers.
pub fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn render(formatted: impl std::fmt::Display) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", formatted).ok()?;
    Some(out)
}
