//! Duration formatting and expiry helpers for presentation layers.

use chrono::{DateTime, Utc};

use crate::clock::millis_between;

/// `90` -> `"1h 30m"`, `25` -> `"25m"`.
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Countdown display, `MM:SS`. Minutes are not wrapped into hours.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// `3725` -> `"1h 2m 5s"`, `65` -> `"1m 5s"`, `9` -> `"9s"`.
pub fn format_focus_time(seconds: u64) -> String {
    let (hours, minutes, secs) = split_hms(seconds);
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Same as [`format_focus_time`] without separators: `"1h2m5s"`.
pub fn format_focus_time_compact(seconds: u64) -> String {
    let (hours, minutes, secs) = split_hms(seconds);
    if hours > 0 {
        format!("{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Whole seconds left until `expires_at`, floored, never negative.
pub fn seconds_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (millis_between(now, expires_at).max(0) / 1000) as u64
}

/// Strictly after the expiry instant.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}

fn split_hms(seconds: u64) -> (u64, u64, u64) {
    (seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}
