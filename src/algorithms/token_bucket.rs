//! Token bucket driver.

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use super::apply_failure_policy;
use crate::clock::Clock;
use crate::config::LimiterConfig;
use crate::error::RateLimitError;
use crate::keys;
use crate::result::RateLimitResult;
use crate::store::Store;

/// Continuously refilling bucket.
///
/// The bucket starts full, so a fresh caller may burst up to `limit` units
/// at once; sustained throughput converges to `limit / window` units per
/// second. Refill is computed from fractional seconds, not window
/// boundaries, and a denied call still advances the bucket's refill mark so
/// elapsed credit is never awarded twice.
pub(crate) struct TokenBucketLimiter {
    store: Arc<dyn Store>,
    config: LimiterConfig,
    clock: Arc<dyn Clock>,
}

impl TokenBucketLimiter {
    pub(crate) fn new(store: Arc<dyn Store>, config: LimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self { store, config, clock }
    }

    pub(crate) async fn allow_n(
        &self,
        key: &str,
        n: i64,
    ) -> Result<RateLimitResult, RateLimitError> {
        let now = self.clock.now();
        let bucket_key = keys::bucket_key(&self.config, key);
        let refill_rate = self.config.refill_rate();
        // State outlives an idle period of two windows before the store
        // reclaims it; a reclaimed bucket just starts full again.
        let ttl = keys::ttl_seconds(self.config.window) * 2;

        let (allowed, remaining) = match self
            .store
            .refill_and_consume(&bucket_key, self.config.limit, n, refill_rate, now.as_secs_f64(), ttl)
            .await
        {
            Ok(reply) => reply,
            Err(err) => return apply_failure_policy(&self.config, err),
        };

        // Time to refill an empty bucket; an over-estimate when the bucket
        // is partially full.
        let time_to_full = Duration::from_secs_f64(self.config.limit as f64 / refill_rate);

        let retry_after = if allowed {
            Duration::ZERO
        } else {
            // Lower-bound estimate: `remaining` is floored, so the true
            // wait may be up to one refill quantum longer.
            Duration::from_secs_f64(((n - remaining) as f64 / refill_rate).max(0.0))
        };

        Ok(RateLimitResult {
            allowed,
            limit: self.config.limit,
            remaining,
            retry_after,
            reset_at: Some(UNIX_EPOCH + now + time_to_full),
        })
    }

    pub(crate) async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        self.store
            .delete(&[keys::bucket_key(&self.config, key)])
            .await
            .map_err(|err| RateLimitError::StorageUnavailable(Box::new(err)))
    }
}
