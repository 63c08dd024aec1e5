//! Redis store backend.
//!
//! Admission is a single `EVALSHA` round-trip per call: each algorithm's
//! read-modify-write runs as a Lua script, so concurrent callers across
//! processes serialize on Redis's script execution. [`redis::Script`]
//! caches the script SHA and falls back to sending the source on
//! `NOSCRIPT`, so a restarted Redis degrades to one extra round-trip.

use async_trait::async_trait;
use redis::{aio::Connection, AsyncCommands, Client, RedisError, Script};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{Store, StoreError};

/// Atomically increment a fixed-window counter, starting its expiry on the
/// increment that created it.
///
/// KEYS[1]: counter key
/// ARGV[1]: increment amount (n)
/// ARGV[2]: TTL in seconds (window duration)
///
/// Returns: the counter value after incrementing.
const FIXED_WINDOW_SCRIPT: &str = r#"
local current = redis.call('INCRBY', KEYS[1], ARGV[1])
if current == tonumber(ARGV[1]) then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
return current
"#;

/// Atomically read the previous window's count, increment the current
/// window's, and maintain both TTLs.
///
/// KEYS[1]: current window key
/// KEYS[2]: previous window key
/// ARGV[1]: increment amount (n)
/// ARGV[2]: current window TTL in seconds
/// ARGV[3]: previous window TTL in seconds
///
/// Returns: {previous_count, current_count}.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local prev = tonumber(redis.call('GET', KEYS[2]) or 0)
local curr = redis.call('INCRBY', KEYS[1], ARGV[1])
if curr == tonumber(ARGV[1]) then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
redis.call('EXPIRE', KEYS[2], ARGV[3])
return {prev, curr}
"#;

/// Atomically refill a token bucket from elapsed time and try to consume.
///
/// The bucket's last_refill advances to now whether or not the take
/// succeeds, so a denied call still captures the elapsed credit.
///
/// KEYS[1]: bucket state key (hash: tokens, last_refill)
/// ARGV[1]: capacity (limit)
/// ARGV[2]: tokens to consume (n)
/// ARGV[3]: refill rate (tokens per second, float)
/// ARGV[4]: current time (fractional seconds since epoch)
/// ARGV[5]: TTL in seconds
///
/// Returns: {allowed (0|1), floor(tokens_remaining)}.
const TOKEN_BUCKET_SCRIPT: &str = r#"
local capacity = tonumber(ARGV[1])
local requested = tonumber(ARGV[2])
local refill_rate = tonumber(ARGV[3])
local now = tonumber(ARGV[4])
local ttl = tonumber(ARGV[5])

local state = redis.call('HMGET', KEYS[1], 'tokens', 'last_refill')
local tokens = tonumber(state[1]) or capacity
local last_refill = tonumber(state[2]) or now

local elapsed = math.max(0, now - last_refill)
tokens = math.min(capacity, tokens + elapsed * refill_rate)

local allowed = 0
if tokens >= requested then
    tokens = tokens - requested
    allowed = 1
end

redis.call('HMSET', KEYS[1], 'tokens', tostring(tokens), 'last_refill', tostring(now))
redis.call('EXPIRE', KEYS[1], ttl)

return {allowed, math.floor(tokens)}
"#;

const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis-backed [`Store`].
///
/// Holds a [`redis::Client`]; connections are acquired per call and bounded
/// by a connection timeout. Clone freely; clones share the client.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    connection_timeout: Duration,
    fixed_window: Script,
    sliding_window: Script,
    token_bucket: Script,
}

impl RedisStore {
    /// Create a store for the given Redis URL.
    ///
    /// The URL is validated here; the first connection is made lazily on
    /// the first call.
    pub fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("invalid redis url: {}", e)))?;

        debug!(url = redis_url, "redis store created");

        Ok(Self {
            client,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            fixed_window: Script::new(FIXED_WINDOW_SCRIPT),
            sliding_window: Script::new(SLIDING_WINDOW_SCRIPT),
            token_bucket: Script::new(TOKEN_BUCKET_SCRIPT),
        })
    }

    /// Replace the connection-acquisition timeout (default 5 s).
    pub fn with_connection_timeout(mut self, connection_timeout: Duration) -> Self {
        self.connection_timeout = connection_timeout;
        self
    }

    async fn get_connection(&self) -> Result<Connection, StoreError> {
        timeout(self.connection_timeout, self.client.get_async_connection())
            .await
            .map_err(|_| {
                warn!(timeout = ?self.connection_timeout, "redis connection timed out");
                StoreError::Timeout(format!(
                    "connection not established within {:?}",
                    self.connection_timeout
                ))
            })?
            .map_err(map_redis_error)
    }
}

fn map_redis_error(error: RedisError) -> StoreError {
    match error.kind() {
        redis::ErrorKind::IoError => {
            warn!(%error, "redis io error");
            StoreError::Connection(error.to_string())
        }
        redis::ErrorKind::TypeError => StoreError::Reply(error.to_string()),
        _ => StoreError::Script(error.to_string()),
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn incr_window(&self, key: &str, n: i64, ttl_secs: i64) -> Result<i64, StoreError> {
        let mut conn = self.get_connection().await?;
        self.fixed_window
            .key(key)
            .arg(n)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn incr_window_pair(
        &self,
        current_key: &str,
        previous_key: &str,
        n: i64,
        current_ttl_secs: i64,
        previous_ttl_secs: i64,
    ) -> Result<(i64, i64), StoreError> {
        let mut conn = self.get_connection().await?;
        self.sliding_window
            .key(current_key)
            .key(previous_key)
            .arg(n)
            .arg(current_ttl_secs)
            .arg(previous_ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn refill_and_consume(
        &self,
        key: &str,
        capacity: i64,
        n: i64,
        refill_rate: f64,
        now: f64,
        ttl_secs: i64,
    ) -> Result<(bool, i64), StoreError> {
        let mut conn = self.get_connection().await?;
        let (allowed, remaining): (i64, i64) = self
            .token_bucket
            .key(key)
            .arg(capacity)
            .arg(n)
            .arg(refill_rate)
            .arg(now)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok((allowed == 1, remaining))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.get_connection().await?;
        let _: i64 = conn.del(keys).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Reply(format!("unexpected ping reply: {}", reply)))
        }
    }

    async fn close(&self) -> Result<(), StoreError> {
        // Connections are per-call; dropping the client releases everything.
        debug!("redis store closed");
        Ok(())
    }
}
