//! Distributed rate limiting over a shared key/value store.
//!
//! Three algorithms behind one handle:
//!
//! - [`Algorithm::FixedWindow`]: counter per fixed time window. Cheapest;
//!   permits a burst of up to twice the limit across a window boundary.
//! - [`Algorithm::SlidingWindow`]: weighted two-window counter that
//!   smooths the boundary burst.
//! - [`Algorithm::TokenBucket`]: continuously refilling budget with burst
//!   tolerance up to the configured limit.
//!
//! Admission is decided server-side: each check is a single atomic
//! read-modify-write executed by the store, so any number of processes
//! sharing a store enforce one combined limit without coordinating with
//! each other. [`store::RedisStore`] backs production deployments;
//! [`store::MemoryStore`] serves single-process use and tests.
//!
//! ```no_run
//! use ratelimit::{Algorithm, LimiterConfig, RateLimiter, store::RedisStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RedisStore::connect("redis://127.0.0.1:6379")?);
//! let config = LimiterConfig::new(Algorithm::SlidingWindow, 100, Duration::from_secs(60))
//!     .with_prefix("api");
//! let limiter = RateLimiter::new(store, config)?;
//!
//! let result = limiter.allow("user:12345").await?;
//! if !result.allowed {
//!     // Deny the request; result.retry_after says when to come back.
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The core emits no logs or metrics on the admission path; wrap the
//! limiter if you want observability around it.

mod algorithms;
pub mod clock;
pub mod config;
pub mod error;
mod keys;
mod limiter;
pub mod result;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Algorithm, LimiterConfig, DEFAULT_PREFIX};
pub use error::RateLimitError;
pub use limiter::RateLimiter;
pub use result::RateLimitResult;
