//! Wall-clock abstraction used for window alignment and token refill.

use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Thread-safe wall-clock source.
///
/// Returns the current time as a [`Duration`] since the Unix epoch with
/// nanosecond precision. Window alignment uses whole seconds of this value;
/// the token bucket uses the fractional part for continuous refill.
pub trait Clock: Send + Sync {
    /// Current time since the Unix epoch.
    fn now(&self) -> Duration;
}

/// System wall clock backed by [`SystemTime::now`].
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

/// Manually driven clock for tests and simulations.
///
/// Starts at a caller-chosen epoch offset and only moves when [`advance`]
/// or [`set`] is called. Wrap it in an `Arc` to share one timeline between
/// a limiter and a store.
///
/// [`advance`]: ManualClock::advance
/// [`set`]: ManualClock::set
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at `start` (a duration since the Unix epoch).
    pub fn new(start: Duration) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }

    /// Jump the clock to an absolute time since the Unix epoch.
    pub fn set(&self, to: Duration) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}
