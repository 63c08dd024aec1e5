//! In-process store backend.
//!
//! Implements the same atomic admission contract as the Redis backend, with
//! a mutex as the serialization point. Useful for single-process
//! deployments and as the store double in tests: it shares a [`Clock`]
//! with the limiter so TTL expiry follows the injected timeline, and it can
//! be switched offline to rehearse store outages.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Store, StoreError};
use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
enum Value {
    Counter(i64),
    Bucket { tokens: f64, last_refill: f64 },
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Duration>,
}

/// Mutex-serialized in-memory [`Store`].
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create a store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a store driven by the given clock. Share the same clock with
    /// the limiter so window expiry and key derivation agree on "now".
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate a store outage: while offline every operation fails with a
    /// connection error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Read a counter value, honoring expiry. Inspection helper for tests
    /// and diagnostics.
    pub fn counter(&self, key: &str) -> Option<i64> {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if !expired(entry, now) => match entry.value {
                Value::Counter(count) => Some(count),
                Value::Bucket { .. } => None,
            },
            _ => None,
        }
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap();
        entries.values().filter(|entry| !expired(entry, now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Connection("store is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn expired(entry: &Entry, now: Duration) -> bool {
    matches!(entry.expires_at, Some(at) if now >= at)
}

fn expiry(now: Duration, ttl_secs: i64) -> Option<Duration> {
    Some(now + Duration::from_secs(ttl_secs.max(0) as u64))
}

/// Drop the entry at `key` if its TTL has passed.
fn evict_expired(entries: &mut HashMap<String, Entry>, key: &str, now: Duration) {
    if let Some(entry) = entries.get(key) {
        if expired(entry, now) {
            entries.remove(key);
        }
    }
}

fn counter_value(entries: &HashMap<String, Entry>, key: &str) -> Result<i64, StoreError> {
    match entries.get(key) {
        None => Ok(0),
        Some(Entry {
            value: Value::Counter(count),
            ..
        }) => Ok(*count),
        Some(_) => Err(StoreError::Script(format!(
            "WRONGTYPE key {} holds bucket state, not a counter",
            key
        ))),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn incr_window(&self, key: &str, n: i64, ttl_secs: i64) -> Result<i64, StoreError> {
        self.check_online()?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        evict_expired(&mut entries, key, now);

        let count = counter_value(&entries, key)? + n;
        let created = !entries.contains_key(key);
        let expires_at = if created {
            expiry(now, ttl_secs)
        } else {
            entries.get(key).and_then(|entry| entry.expires_at)
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Counter(count),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn incr_window_pair(
        &self,
        current_key: &str,
        previous_key: &str,
        n: i64,
        current_ttl_secs: i64,
        previous_ttl_secs: i64,
    ) -> Result<(i64, i64), StoreError> {
        self.check_online()?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        evict_expired(&mut entries, current_key, now);
        evict_expired(&mut entries, previous_key, now);

        let previous = counter_value(&entries, previous_key)?;

        let current = counter_value(&entries, current_key)? + n;
        let created = !entries.contains_key(current_key);
        let expires_at = if created {
            expiry(now, current_ttl_secs)
        } else {
            entries.get(current_key).and_then(|entry| entry.expires_at)
        };
        entries.insert(
            current_key.to_string(),
            Entry {
                value: Value::Counter(current),
                expires_at,
            },
        );

        // EXPIRE on a missing key is a no-op, same as the store.
        if let Some(entry) = entries.get_mut(previous_key) {
            entry.expires_at = expiry(now, previous_ttl_secs);
        }

        Ok((previous, current))
    }

    async fn refill_and_consume(
        &self,
        key: &str,
        capacity: i64,
        n: i64,
        refill_rate: f64,
        now_secs: f64,
        ttl_secs: i64,
    ) -> Result<(bool, i64), StoreError> {
        self.check_online()?;
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        evict_expired(&mut entries, key, now);

        let (mut tokens, last_refill) = match entries.get(key) {
            Some(Entry {
                value: Value::Bucket { tokens, last_refill },
                ..
            }) => (*tokens, *last_refill),
            Some(_) => {
                return Err(StoreError::Script(format!(
                    "WRONGTYPE key {} holds a counter, not bucket state",
                    key
                )))
            }
            None => (capacity as f64, now_secs),
        };

        let elapsed = (now_secs - last_refill).max(0.0);
        tokens = (tokens + elapsed * refill_rate).min(capacity as f64);

        let allowed = tokens >= n as f64;
        if allowed {
            tokens -= n as f64;
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Bucket {
                    tokens,
                    last_refill: now_secs,
                },
                expires_at: expiry(now, ttl_secs),
            },
        );

        Ok((allowed, tokens.floor() as i64))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        self.check_online()?;
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
