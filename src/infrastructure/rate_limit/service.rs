//! Rate limit backend trait and error types.

use async_trait::async_trait;
use std::time::Duration;

/// Errors raised by a counter store.
///
/// Never surfaced to callers: the rate limiter turns them into degraded mode.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit backend connection error: {0}")]
    Connection(String),
    #[error("Rate limit backend operation error: {0}")]
    Operation(String),
    #[error("Rate limit backend timed out after {0:?}")]
    Timeout(Duration),
}

impl From<redis::RedisError> for RateLimitError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
            Self::Connection(e.to_string())
        } else {
            Self::Operation(e.to_string())
        }
    }
}

/// Result type for backend operations.
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Counter store behind the fixed-window rate limiter.
///
/// Implementations must make `increment` atomic per key: concurrent callers
/// on the same key each observe a distinct post-increment count.
///
/// # Implementations
///
/// - [`crate::infrastructure::rate_limit::MemoryBackend`] - in-process map
/// - [`crate::infrastructure::rate_limit::RedisBackend`] - shared Redis store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Counts one request for `key` in the current window of length `window`
    /// and returns the post-increment count.
    ///
    /// The first increment in a window returns `1`. Window state expires on
    /// its own; callers never sweep.
    async fn increment(&self, key: &str, window: Duration) -> RateLimitResult<u64>;

    /// Checks whether the store is reachable.
    async fn health_check(&self) -> bool;

    /// Short backend name for logs and rejection details.
    fn name(&self) -> &'static str;
}
