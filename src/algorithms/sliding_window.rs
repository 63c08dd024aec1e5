//! Sliding window counter driver.

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use super::apply_failure_policy;
use crate::clock::Clock;
use crate::config::LimiterConfig;
use crate::error::RateLimitError;
use crate::keys;
use crate::result::RateLimitResult;
use crate::store::Store;

/// Weighted two-window counter.
///
/// The effective count at any instant is
/// `previous * (1 - progress) + current`, where `progress` is how far the
/// current window has advanced. This smooths the fixed window's boundary
/// burst: the previous window's traffic decays linearly instead of
/// vanishing at the boundary.
///
/// Like the fixed window, denials still add their cost to the current
/// counter; the check-and-increment stays a single store round-trip.
pub(crate) struct SlidingWindowLimiter {
    store: Arc<dyn Store>,
    config: LimiterConfig,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub(crate) fn new(store: Arc<dyn Store>, config: LimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self { store, config, clock }
    }

    pub(crate) async fn allow_n(
        &self,
        key: &str,
        n: i64,
    ) -> Result<RateLimitResult, RateLimitError> {
        let now = self.clock.now();
        let start = keys::aligned_window_start(now, self.config.window);
        let current_unix = keys::window_start_unix(start);
        let reset = keys::reset_deadline(current_unix, self.config.window);

        // A cost above the limit can never be admitted; deny without
        // inflating the counter.
        if n > self.config.limit {
            return Ok(RateLimitResult {
                allowed: false,
                limit: self.config.limit,
                remaining: 0,
                retry_after: reset.saturating_sub(now),
                reset_at: Some(UNIX_EPOCH + reset),
            });
        }

        let previous_unix = keys::previous_window_start_unix(current_unix, self.config.window);
        let current_key = keys::window_key(&self.config, key, current_unix);
        let previous_key = keys::window_key(&self.config, key, previous_unix);
        let current_ttl = keys::ttl_seconds(self.config.window);

        let (previous_count, current_count) = match self
            .store
            .incr_window_pair(&current_key, &previous_key, n, current_ttl, current_ttl * 2)
            .await
        {
            Ok(counts) => counts,
            Err(err) => return apply_failure_policy(&self.config, err),
        };

        let progress = keys::window_progress(now, start, self.config.window);
        let weighted = previous_count as f64 * (1.0 - progress) + current_count as f64;
        let allowed = weighted <= self.config.limit as f64;

        Ok(RateLimitResult {
            allowed,
            limit: self.config.limit,
            remaining: (self.config.limit - weighted.floor() as i64).max(0),
            retry_after: if allowed {
                Duration::ZERO
            } else {
                reset.saturating_sub(now)
            },
            reset_at: Some(UNIX_EPOCH + reset),
        })
    }

    pub(crate) async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        let start = keys::aligned_window_start(self.clock.now(), self.config.window);
        let current_unix = keys::window_start_unix(start);
        let previous_unix = keys::previous_window_start_unix(current_unix, self.config.window);

        self.store
            .delete(&[
                keys::window_key(&self.config, key, current_unix),
                keys::window_key(&self.config, key, previous_unix),
            ])
            .await
            .map_err(|err| RateLimitError::StorageUnavailable(Box::new(err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Algorithm;
    use crate::store::MemoryStore;

    fn limiter(
        limit: i64,
        window: Duration,
    ) -> (Arc<ManualClock>, Arc<MemoryStore>, SlidingWindowLimiter) {
        // Aligned to every window size used in these tests.
        let clock = Arc::new(ManualClock::new(Duration::from_secs(1_200_000)));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let config =
            LimiterConfig::new(Algorithm::SlidingWindow, limit, window).with_prefix("test");
        let driver = SlidingWindowLimiter::new(store.clone(), config, clock.clone());
        (clock, store, driver)
    }

    #[tokio::test]
    async fn previous_window_decays_linearly() {
        let (clock, _store, driver) = limiter(100, Duration::from_secs(60));

        // 80 units midway through the previous window.
        clock.advance(Duration::from_secs(30));
        driver.allow_n("u", 80).await.unwrap();

        // A call early in the next window keeps the previous key's TTL
        // alive across the boundary.
        clock.advance(Duration::from_secs(31));
        driver.allow_n("u", 9).await.unwrap();

        // Halfway into the current window the previous 80 weigh 40.
        clock.advance(Duration::from_secs(29));
        let result = driver.allow_n("u", 5).await.unwrap();
        // weighted = 80 * 0.5 + (9 + 5) = 54
        assert!(result.allowed);
        assert_eq!(result.remaining, 46);
    }

    #[tokio::test]
    async fn denial_is_monotone_at_a_fixed_instant() {
        let (_clock, _store, driver) = limiter(3, Duration::from_secs(60));

        driver.allow_n("u", 3).await.unwrap();
        let first = driver.allow_n("u", 1).await.unwrap();
        let second = driver.allow_n("u", 1).await.unwrap();
        assert!(!first.allowed);
        assert!(!second.allowed);
        assert_eq!(second.remaining, 0);
    }

    #[tokio::test]
    async fn cost_above_limit_short_circuits() {
        let (_clock, store, driver) = limiter(10, Duration::from_secs(60));

        let result = driver.allow_n("u", 11).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert!(result.retry_after > Duration::ZERO);
        // The store was never touched.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn expired_previous_window_counts_as_zero() {
        let (clock, _store, driver) = limiter(3, Duration::from_secs(2));

        driver.allow_n("u", 3).await.unwrap();
        let denied = driver.allow_n("u", 1).await.unwrap();
        assert!(!denied.allowed);

        // The old counter's TTL lapses before anything refreshes it, so
        // its contribution drops to zero.
        clock.advance(Duration::from_secs(3));
        let result = driver.allow_n("u", 1).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.remaining, 2);
    }

    #[tokio::test]
    async fn reset_deletes_both_window_keys() {
        let (clock, store, driver) = limiter(10, Duration::from_secs(60));

        clock.advance(Duration::from_secs(30));
        driver.allow_n("u", 4).await.unwrap();
        clock.advance(Duration::from_secs(31));
        driver.allow_n("u", 2).await.unwrap();
        assert_eq!(store.counter("test:u:1200000"), Some(4));
        assert_eq!(store.counter("test:u:1200060"), Some(2));

        driver.reset("u").await.unwrap();
        assert_eq!(store.counter("test:u:1200000"), None);
        assert_eq!(store.counter("test:u:1200060"), None);
    }
}
