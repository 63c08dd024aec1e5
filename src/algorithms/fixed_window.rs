//! Fixed window counter driver.

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use super::apply_failure_policy;
use crate::clock::Clock;
use crate::config::LimiterConfig;
use crate::error::RateLimitError;
use crate::keys;
use crate::result::RateLimitResult;
use crate::store::Store;

/// Counter that resets at fixed window boundaries.
///
/// Every call, admitted or denied, adds its cost to the window counter:
/// the counter tracks requests seen, not requests admitted. The well-known
/// consequence is that two adjacent windows can each admit up to `limit`,
/// allowing a short burst of `2 * limit` across the boundary.
pub(crate) struct FixedWindowLimiter {
    store: Arc<dyn Store>,
    config: LimiterConfig,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
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
        let start_unix = keys::window_start_unix(start);
        let window_key = keys::window_key(&self.config, key, start_unix);

        let count = match self
            .store
            .incr_window(&window_key, n, keys::ttl_seconds(self.config.window))
            .await
        {
            Ok(count) => count,
            Err(err) => return apply_failure_policy(&self.config, err),
        };

        let reset = keys::reset_deadline(start_unix, self.config.window);
        let allowed = count <= self.config.limit;

        Ok(RateLimitResult {
            allowed,
            limit: self.config.limit,
            remaining: (self.config.limit - count).max(0),
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
        let window_key =
            keys::window_key(&self.config, key, keys::window_start_unix(start));

        self.store
            .delete(&[window_key])
            .await
            .map_err(|err| RateLimitError::StorageUnavailable(Box::new(err)))
    }
}
