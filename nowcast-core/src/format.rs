//! Display helpers that turn raw observation fields into strings.

use chrono::{DateTime, FixedOffset};

/// Shown in place of any value the API did not return.
pub const PLACEHOLDER: &str = "N/A";

/// Formats a UNIX timestamp as wall-clock time at `tz_offset` seconds east of UTC.
pub fn format_local_time(ts: Option<i64>, tz_offset: i64) -> String {
    let Some(ts) = ts else {
        return PLACEHOLDER.to_string();
    };

    let offset = i32::try_from(tz_offset).ok().and_then(FixedOffset::east_opt);
    match (DateTime::from_timestamp(ts, 0), offset) {
        (Some(utc), Some(offset)) => utc.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Upper-cases the first letter of every word and lower-cases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;

    for ch in text.chars() {
        if ch.is_alphabetic() {
            if word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(ch);
            word_start = true;
        }
    }

    out
}
