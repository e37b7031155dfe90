//! Miscellaneous shared helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// The wall clock as unix seconds.
pub fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
