use chrono::{DateTime, Utc};
use core_types::parse_timestamp;

/// `May 1, 2024`, or an empty string when the timestamp is absent or bad.
pub fn format_short_date(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(|at| short_date_label(&at))
        .unwrap_or_default()
}

pub fn short_date_label(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// `01/05/2024`, or an empty string when the timestamp is absent or bad.
pub fn format_numeric_date(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(|at| at.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}
