//! Application layer: the admission gate in front of the archive API.
//!
//! The services here know nothing about routing. They consume the
//! [`RateLimitBackend`](crate::infrastructure::rate_limit::RateLimitBackend)
//! port and request headers, and produce admit/reject decisions.
//!
//! # Available Services
//!
//! - [`services::client_key_service::ClientKeyService`] - Proxy-aware client key resolution
//! - [`services::rate_limit_service::RateLimitService`] - Fixed-window limiter with degraded mode
//! - [`services::auth_service::AuthService`] - Credential evaluators under a composition strategy
//! - [`services::payload_guard::PayloadGuard`] - Body size and batch limits
//! - [`services::admission_pipeline::AdmissionPipeline`] - Runs all of the above in order

pub mod services;
