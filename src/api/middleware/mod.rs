//! HTTP middleware for request processing and protection.
//!
//! Provides request ids, the admission gate, and observability middleware.

pub mod admission;
pub mod request_id;
pub mod tracing;
