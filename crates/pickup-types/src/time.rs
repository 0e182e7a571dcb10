use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// `|now - timestamp| <= window`, without overflow in either direction.
pub fn within_window(now: u64, timestamp: u64, window: u64) -> bool {
    now.abs_diff(timestamp) <= window
}
