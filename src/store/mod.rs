//! Shared-store contract.
//!
//! All per-caller state lives in the store; the limiter holds none. Each
//! admission method below is a single atomic read-modify-write: the store
//! must execute it without interleaving any other operation on the same
//! keys. That atomicity is the entire correctness argument for concurrent
//! admission: two racing calls against one key can never both observe a
//! state that would over-admit.
//!
//! [`RedisStore`](redis::RedisStore) implements the contract with
//! server-side Lua scripts. [`MemoryStore`](memory::MemoryStore) implements
//! it in-process under a mutex, for single-node use and for tests. A store
//! without a scripting primitive can still satisfy the contract with a
//! compare-and-swap loop over packed state.

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Transport and protocol failures surfaced by a store backend.
#[derive(Debug)]
pub enum StoreError {
    /// The store could not be reached or the connection dropped mid-call.
    Connection(String),
    /// The round-trip exceeded the configured deadline.
    Timeout(String),
    /// The store rejected or failed to execute an admission script.
    Script(String),
    /// The store replied with an unexpected shape or type.
    Reply(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "store connection error: {}", msg),
            StoreError::Timeout(msg) => write!(f, "store timeout: {}", msg),
            StoreError::Script(msg) => write!(f, "store script error: {}", msg),
            StoreError::Reply(msg) => write!(f, "unexpected store reply: {}", msg),
        }
    }
}

impl Error for StoreError {}

/// Key/value store with atomic admission operations and per-key TTLs.
///
/// TTLs are whole seconds. Counter values are signed 64-bit integers with
/// INCRBY semantics. Implementations must be safe for concurrent callers.
#[async_trait]
pub trait Store: Send + Sync {
    /// Atomically add `n` to the counter at `key` and return the new value.
    ///
    /// If the increment created the key (post-increment value equals `n`),
    /// its TTL is set to `ttl_secs`; an existing key's TTL is left alone.
    async fn incr_window(&self, key: &str, n: i64, ttl_secs: i64) -> Result<i64, StoreError>;

    /// Atomically read the counter at `previous_key` (zero if absent), add
    /// `n` to the counter at `current_key`, and return
    /// `(previous, current)`.
    ///
    /// The current key's TTL is set to `current_ttl_secs` only when this
    /// call created it; the previous key's TTL is refreshed to
    /// `previous_ttl_secs` whenever it exists.
    async fn incr_window_pair(
        &self,
        current_key: &str,
        previous_key: &str,
        n: i64,
        current_ttl_secs: i64,
        previous_ttl_secs: i64,
    ) -> Result<(i64, i64), StoreError>;

    /// Atomically refill the token bucket at `key` and try to take `n`
    /// tokens from it.
    ///
    /// A missing bucket starts full (`capacity` tokens, last refill `now`).
    /// Refill credits `elapsed * refill_rate` tokens, capped at `capacity`
    /// and never negative. Whether or not the take succeeds, the bucket's
    /// `last_refill` is advanced to `now` and its TTL refreshed to
    /// `ttl_secs`. Returns `(taken, floor(tokens))` with the token count as
    /// it stands after the attempt.
    async fn refill_and_consume(
        &self,
        key: &str,
        capacity: i64,
        n: i64,
        refill_rate: f64,
        now: f64,
        ttl_secs: i64,
    ) -> Result<(bool, i64), StoreError>;

    /// Delete the given keys. Deleting a missing key is not an error.
    async fn delete(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release the store handle. Implementations should tolerate repeated
    /// calls; the limiter tracks its own closed state.
    async fn close(&self) -> Result<(), StoreError>;
}
