//! Window alignment and store-key derivation.
//!
//! Key layout is bit-stable and shared with every other process pointing at
//! the same store:
//!
//! - fixed/sliding window: `<prefix>:<caller>:<window_start_unix>`
//! - token bucket: `<prefix>:<caller>`

use std::time::Duration;

use crate::config::LimiterConfig;

/// Align `now` down to the start of its window.
///
/// Computed at millisecond precision so sub-second windows align correctly;
/// both values are durations since the Unix epoch.
pub(crate) fn aligned_window_start(now: Duration, window: Duration) -> Duration {
    let window_ms = window.as_millis().max(1);
    let start_ms = (now.as_millis() / window_ms) * window_ms;
    Duration::from_millis(start_ms as u64)
}

/// Whole-second Unix timestamp used as the key suffix for a window start.
pub(crate) fn window_start_unix(start: Duration) -> i64 {
    start.as_secs() as i64
}

/// Start of the window preceding `current_start_unix`.
pub(crate) fn previous_window_start_unix(current_start_unix: i64, window: Duration) -> i64 {
    current_start_unix - window.as_secs() as i64
}

/// Store key for a caller's counter in the window starting at `start_unix`.
pub(crate) fn window_key(config: &LimiterConfig, key: &str, start_unix: i64) -> String {
    format!("{}:{}", config.formatted_key(key), start_unix)
}

/// Store key for a caller's token bucket state.
pub(crate) fn bucket_key(config: &LimiterConfig, key: &str) -> String {
    config.formatted_key(key)
}

/// Instant (as a duration since the Unix epoch) at which the window
/// starting at `start_unix` ends.
pub(crate) fn reset_deadline(start_unix: i64, window: Duration) -> Duration {
    Duration::from_secs(start_unix as u64) + window
}

/// Fraction of the current window already elapsed, clamped to [0, 1].
pub(crate) fn window_progress(now: Duration, start: Duration, window: Duration) -> f64 {
    if window.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_sub(start);
    (elapsed.as_secs_f64() / window.as_secs_f64()).clamp(0.0, 1.0)
}

/// TTL for a window key, in whole seconds as the store requires.
///
/// Sub-second windows round up to one second so the store's expiry still
/// fires.
pub(crate) fn ttl_seconds(window: Duration) -> i64 {
    (window.as_secs() as i64).max(1)
}
