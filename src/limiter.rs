//! The public limiter handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::algorithms::fixed_window::FixedWindowLimiter;
use crate::algorithms::sliding_window::SlidingWindowLimiter;
use crate::algorithms::token_bucket::TokenBucketLimiter;
use crate::clock::{Clock, SystemClock};
use crate::config::{Algorithm, LimiterConfig};
use crate::error::RateLimitError;
use crate::result::RateLimitResult;
use crate::store::Store;

enum Driver {
    FixedWindow(FixedWindowLimiter),
    SlidingWindow(SlidingWindowLimiter),
    TokenBucket(TokenBucketLimiter),
}

/// A distributed rate limiter.
///
/// One instance serves any number of caller keys; all accounting state
/// lives in the shared store, so every process pointing the same config at
/// the same store enforces one combined limit. The instance itself holds
/// only the immutable config and the store handle and is safe to share
/// across tasks.
///
/// # Example
///
/// ```no_run
/// use ratelimit::{Algorithm, LimiterConfig, RateLimiter};
/// use ratelimit::store::RedisStore;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(RedisStore::connect("redis://127.0.0.1:6379")?);
/// let config = LimiterConfig::new(Algorithm::TokenBucket, 100, Duration::from_secs(60));
/// let limiter = RateLimiter::new(store, config)?;
///
/// let result = limiter.allow("user:12345").await?;
/// if !result.allowed {
///     println!("rate limited, retry in {:?}", result.retry_after);
/// }
/// # Ok(())
/// # }
/// ```
pub struct RateLimiter {
    driver: Driver,
    store: Arc<dyn Store>,
    algorithm: Algorithm,
    closed: AtomicBool,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("algorithm", &self.algorithm)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl RateLimiter {
    /// Build a limiter for the algorithm named in `config`, using the
    /// system clock.
    ///
    /// Fails with [`RateLimitError::InvalidConfig`] if the config violates
    /// an invariant.
    pub fn new(store: Arc<dyn Store>, config: LimiterConfig) -> Result<Self, RateLimitError> {
        Self::with_clock(store, config, Arc::new(SystemClock::new()))
    }

    /// Build a limiter reading time from the given clock.
    ///
    /// Share the clock with a [`MemoryStore`](crate::store::MemoryStore)
    /// to drive window expiry and refill deterministically in tests.
    pub fn with_clock(
        store: Arc<dyn Store>,
        config: LimiterConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateLimitError> {
        config.validate()?;
        let algorithm = config.algorithm;
        let driver = match algorithm {
            Algorithm::FixedWindow => Driver::FixedWindow(FixedWindowLimiter::new(
                store.clone(),
                config,
                clock,
            )),
            Algorithm::SlidingWindow => Driver::SlidingWindow(SlidingWindowLimiter::new(
                store.clone(),
                config,
                clock,
            )),
            Algorithm::TokenBucket => Driver::TokenBucket(TokenBucketLimiter::new(
                store.clone(),
                config,
                clock,
            )),
        };
        Ok(Self {
            driver,
            store,
            algorithm,
            closed: AtomicBool::new(false),
        })
    }

    /// Which algorithm this limiter runs.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Check whether one unit is admitted for `key`.
    pub async fn allow(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        self.allow_n(key, 1).await
    }

    /// Check whether `n` units are admitted for `key`.
    ///
    /// On store failure the configured failure policy applies: fail-open
    /// returns the degraded admitted result, fail-closed returns
    /// [`RateLimitError::StorageUnavailable`]. Dropping the returned future
    /// cancels the store round-trip; the store may or may not have applied
    /// the write, and no compensation is attempted.
    pub async fn allow_n(&self, key: &str, n: i64) -> Result<RateLimitResult, RateLimitError> {
        self.check_open()?;
        if key.is_empty() {
            return Err(RateLimitError::InvalidKey);
        }
        if n <= 0 {
            return Err(RateLimitError::InvalidN(n));
        }
        match &self.driver {
            Driver::FixedWindow(driver) => driver.allow_n(key, n).await,
            Driver::SlidingWindow(driver) => driver.allow_n(key, n).await,
            Driver::TokenBucket(driver) => driver.allow_n(key, n).await,
        }
    }

    /// Clear the stored state for `key`, restoring its full budget.
    ///
    /// Idempotent: resetting a key with no state succeeds. Store failures
    /// are always surfaced, regardless of the fail-open setting.
    pub async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_open()?;
        if key.is_empty() {
            return Err(RateLimitError::InvalidKey);
        }
        match &self.driver {
            Driver::FixedWindow(driver) => driver.reset(key).await,
            Driver::SlidingWindow(driver) => driver.reset(key).await,
            Driver::TokenBucket(driver) => driver.reset(key).await,
        }
    }

    /// Probe the store. Store failures are surfaced as-is.
    pub async fn ping(&self) -> Result<(), RateLimitError> {
        self.check_open()?;
        self.store
            .ping()
            .await
            .map_err(|err| RateLimitError::StorageUnavailable(Box::new(err)))
    }

    /// Release the store handle. Every later operation, including a second
    /// `close`, fails with [`RateLimitError::Closed`].
    pub async fn close(&self) -> Result<(), RateLimitError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(RateLimitError::Closed);
        }
        self.store
            .close()
            .await
            .map_err(|err| RateLimitError::StorageUnavailable(Box::new(err)))
    }

    fn check_open(&self) -> Result<(), RateLimitError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(RateLimitError::Closed)
        } else {
            Ok(())
        }
    }
}
