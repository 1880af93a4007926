//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a remaining lifetime the way story badges show it
///
/// - `>= 1h` → `"5h"`
/// - `>= 1m` → `"12m"`
/// - `> 0` → `"45s"`
/// - otherwise `"expired"`
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let seconds = remaining.num_seconds();
    if seconds <= 0 {
        "expired".to_string()
    } else if seconds >= 3600 {
        format!("{}h", seconds / 3600)
    } else if seconds >= 60 {
        format!("{}m", seconds / 60)
    } else {
        format!("{}s", seconds)
    }
}
