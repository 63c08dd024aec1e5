//! Shared fixture: a limiter wired to an in-process store, both reading
//! the same manually driven clock.

use ratelimit::store::MemoryStore;
use ratelimit::{LimiterConfig, ManualClock, RateLimiter};
use std::sync::Arc;
use std::time::Duration;

/// Fixture epoch, aligned to every window length the scenarios use.
pub const EPOCH: Duration = Duration::from_secs(1_700_000_100);

pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub limiter: RateLimiter,
}

pub fn fixture(config: LimiterConfig) -> Fixture {
    let clock = Arc::new(ManualClock::new(EPOCH));
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let limiter = RateLimiter::with_clock(store.clone(), config, clock.clone())
        .expect("valid test config");
    Fixture {
        clock,
        store,
        limiter,
    }
}
