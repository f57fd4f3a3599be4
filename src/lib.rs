//! # Civic Archive API
//!
//! A public archive of civic records (news, meeting minutes, speech segments)
//! served over HTTP, with a layered admission gate in front of every `/api`
//! route.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - Client identity, principal and record entities; storage port
//! - **Application Layer** ([`application`]) - Admission services: proxy trust,
//!   credentials, rate limiting, payload limits
//! - **Infrastructure Layer** ([`infrastructure`]) - Rate limit backends (memory, Redis) and storage
//! - **API Layer** ([`api`]) - Handlers, DTOs and middleware
//!
//! ## Admission Order
//!
//! 1. Declared `Content-Length` and streamed body size
//! 2. Client key from the peer address (or `X-Forwarded-For` behind a trusted proxy)
//! 3. Credential checks (`X-API-Key`, bearer JWT), all required
//! 4. Fixed-window rate limit, with fail-open/closed degraded mode
//! 5. Batch size
//!
//! ## Quick Start
//!
//! ```bash
//! export REQUIRE_API_KEY=true
//! export API_KEY="$(cargo run --bin admin -- key generate --raw)"
//! export RATE_LIMIT_PER_MINUTE=120
//!
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::services::{
        AdmissionPipeline, AuthService, ClientKeyService, PayloadGuard, RateLimitPolicy,
        RateLimitService, TrustedProxies,
    };
    pub use crate::domain::entities::{ClientProvenance, Principal, ResolvedClient};
    pub use crate::error::AppError;
    pub use crate::state::AppState;
}
