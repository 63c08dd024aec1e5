//! Limiter configuration and validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::RateLimitError;

/// Default store key prefix.
pub const DEFAULT_PREFIX: &str = "ratelimit";

/// Smallest accepted window.
const MIN_WINDOW: Duration = Duration::from_millis(1);
/// Largest accepted window (365 days).
const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Rate limiting algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Smooth rate limiting with burst tolerance. Best for APIs and
    /// variable traffic patterns.
    TokenBucket,
    /// Precise rate limiting with weighted windows. Best for billing and
    /// SLA enforcement; resists window-boundary gaming.
    SlidingWindow,
    /// Simple counter-based rate limiting. Best for internal services and
    /// soft quotas.
    FixedWindow,
}

/// Immutable description of a limiter instance.
///
/// Built with [`LimiterConfig::new`] and the `with_*` methods, then handed
/// to [`RateLimiter::new`](crate::RateLimiter::new), which validates it.
///
/// # Example
///
/// ```
/// use ratelimit::{Algorithm, LimiterConfig};
/// use std::time::Duration;
///
/// let config = LimiterConfig::new(Algorithm::TokenBucket, 100, Duration::from_secs(60))
///     .with_prefix("api")
///     .with_fail_open(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Which algorithm decides admission.
    pub algorithm: Algorithm,
    /// Maximum units admissible per window. For the token bucket this is
    /// both the bucket capacity and the numerator of the refill rate.
    pub limit: i64,
    /// Accounting period. For the token bucket, the denominator of the
    /// refill rate.
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Store key prefix. `None` means the default `"ratelimit"`; an empty
    /// string disables prefixing entirely.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Behavior when the store is unreachable: `true` admits the request
    /// with a degraded result, `false` surfaces the error.
    #[serde(default)]
    pub fail_open: bool,
}

impl LimiterConfig {
    /// Create a config with the default prefix and fail-closed behavior.
    pub fn new(algorithm: Algorithm, limit: i64, window: Duration) -> Self {
        Self {
            algorithm,
            limit,
            window,
            prefix: None,
            fail_open: false,
        }
    }

    /// Replace the key prefix. Pass `""` to disable prefixing.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the failure policy for store outages.
    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        if self.limit <= 0 {
            return Err(RateLimitError::InvalidConfig(format!(
                "limit must be greater than 0, got {}",
                self.limit
            )));
        }
        if self.window < MIN_WINDOW {
            return Err(RateLimitError::InvalidConfig(format!(
                "window too small: {:?} (minimum: 1ms)",
                self.window
            )));
        }
        if self.window > MAX_WINDOW {
            return Err(RateLimitError::InvalidConfig(format!(
                "window too large: {:?} (maximum: 365 days)",
                self.window
            )));
        }
        Ok(())
    }

    /// The effective prefix after defaulting.
    pub fn key_prefix(&self) -> &str {
        match &self.prefix {
            Some(prefix) => prefix,
            None => DEFAULT_PREFIX,
        }
    }

    /// Prepend the configured prefix to a caller key.
    pub fn formatted_key(&self, key: &str) -> String {
        let prefix = self.key_prefix();
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", prefix, key)
        }
    }

    /// Refill rate for the token bucket, in units per second.
    pub fn refill_rate(&self) -> f64 {
        self.limit as f64 / self.window.as_secs_f64()
    }
}
