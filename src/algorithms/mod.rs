//! Admission drivers, one per algorithm.
//!
//! A driver assembles store arguments from the config and the clock, makes
//! the single atomic store call, and turns the reply into a
//! [`RateLimitResult`]. Everything around the store round-trip is pure
//! arithmetic; drivers hold no per-caller state and are safe to share.
//!
//! Callers do not use drivers directly; the [`RateLimiter`](crate::RateLimiter)
//! handle owns one and dispatches to it.

pub(crate) mod fixed_window;
pub(crate) mod sliding_window;
pub(crate) mod token_bucket;

use crate::config::LimiterConfig;
use crate::error::RateLimitError;
use crate::result::RateLimitResult;
use crate::store::StoreError;

/// Route a store failure through the configured failure policy.
///
/// Fail-open admits with the degraded result and swallows the cause;
/// fail-closed surfaces it as `StorageUnavailable`.
pub(crate) fn apply_failure_policy(
    config: &LimiterConfig,
    err: StoreError,
) -> Result<RateLimitResult, RateLimitError> {
    if config.fail_open {
        Ok(RateLimitResult::fail_open())
    } else {
        Err(RateLimitError::StorageUnavailable(Box::new(err)))
    }
}
