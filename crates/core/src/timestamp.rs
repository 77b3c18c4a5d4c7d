//! Conversion between seconds and `H:MM:SS` timestamps.

use regex::Regex;
use std::sync::LazyLock;

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(:\d{1,2})+").expect("timestamp pattern is valid"));

/// Format seconds as `M:SS`, or `H:MM:SS` once an hour is reached
pub fn seconds_to_timestamp(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Find the first timestamp in `text` and return it in seconds
///
/// The last component is seconds and every preceding one is a more
/// significant base-60 digit. Components are not range checked.
pub fn parse_timestamp(text: &str) -> Option<u64> {
    let found = TIMESTAMP_RE.find(text)?;

    found.as_str().split(':').try_fold(0u64, |acc, part| {
        let value: u64 = part.parse().ok()?;
        acc.checked_mul(60)?.checked_add(value)
    })
}

/// Text inserted at the cursor for the current playback time
pub fn insertion_text(current_time: u64) -> String {
    format!("[{}]", seconds_to_timestamp(current_time))
}

/// Seconds to seek to for the user's selection
pub fn seek_target(selected_text: &str) -> Option<u64> {
    parse_timestamp(selected_text)
}
