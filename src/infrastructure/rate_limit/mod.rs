//! Counter stores for the fixed-window rate limiter.
//!
//! Provides a [`RateLimitBackend`] trait with two implementations:
//! - [`MemoryBackend`] - per-process counters
//! - [`RedisBackend`] - counters shared across instances through Redis

mod memory_backend;
mod redis_backend;
mod service;

pub use memory_backend::MemoryBackend;
pub use redis_backend::RedisBackend;
pub use service::{RateLimitBackend, RateLimitError, RateLimitResult};

#[cfg(test)]
pub use service::MockRateLimitBackend;
