//! Admission outcome record.

use serde::Serialize;
use std::time::{Duration, SystemTime};

/// Outcome of a single admission check.
///
/// Returned by every `allow`/`allow_n` call that does not error. In the
/// fail-open degraded outcome the accounting fields are zeroed and
/// `reset_at` is `None`; callers that care about store health must watch
/// for that shape (or monitor the store out-of-band).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitResult {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// The configured limit, echoed for convenience. Zero in the degraded
    /// fail-open outcome.
    pub limit: i64,
    /// Budget left in the current window after this call. Zero when denied.
    pub remaining: i64,
    /// How long to wait before the same cost could be admitted. Zero when
    /// allowed.
    #[serde(with = "humantime_serde")]
    pub retry_after: Duration,
    /// When the current window resets (or a drained bucket refills).
    /// `None` in degraded outcomes.
    pub reset_at: Option<SystemTime>,
}

impl RateLimitResult {
    /// The degraded result returned when the store is down and the limiter
    /// is configured to fail open.
    pub fn fail_open() -> Self {
        Self {
            allowed: true,
            limit: 0,
            remaining: 0,
            retry_after: Duration::ZERO,
            reset_at: None,
        }
    }

    /// Whether this is the degraded fail-open outcome rather than a real
    /// accounting decision.
    pub fn is_degraded(&self) -> bool {
        self.allowed && self.limit == 0 && self.reset_at.is_none()
    }
}
