//! Error types for the rate limiting core.

use std::error::Error;
use std::fmt;

/// Errors produced by limiter construction and admission calls.
///
/// Storage failures on `allow`/`allow_n` are routed through the configured
/// failure policy before they reach the caller; see
/// [`LimiterConfig::fail_open`](crate::config::LimiterConfig).
#[derive(Debug)]
pub enum RateLimitError {
    /// Configuration violates an invariant. The message names the field.
    InvalidConfig(String),
    /// The caller key is empty.
    InvalidKey,
    /// The requested cost is zero or negative.
    InvalidN(i64),
    /// The shared store could not be reached or returned a malformed reply.
    /// Wraps the underlying cause.
    StorageUnavailable(Box<dyn Error + Send + Sync>),
    /// The limiter was used after `close`.
    Closed,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            RateLimitError::InvalidKey => write!(f, "invalid key: must not be empty"),
            RateLimitError::InvalidN(n) => {
                write!(f, "invalid n: must be greater than 0, got {}", n)
            }
            RateLimitError::StorageUnavailable(cause) => {
                write!(f, "rate limiter storage unavailable: {}", cause)
            }
            RateLimitError::Closed => write!(f, "rate limiter is closed"),
        }
    }
}

impl Error for RateLimitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RateLimitError::StorageUnavailable(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl RateLimitError {
    /// Check if this error reports an unreachable store.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    /// Check if this error reports use after close.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Check if this error reports invalid caller input (key or cost).
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidKey | Self::InvalidN(_))
    }
}
