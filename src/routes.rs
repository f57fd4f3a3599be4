//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /health`        - Liveness (public)
//! - `GET  /health/live`   - Liveness (public)
//! - `GET  /health/ready`  - Readiness: archive store and rate limit backend (public)
//! - `/api/*`              - Archive API behind the admission gate
//!
//! # Middleware
//!
//! - **Request id** - assigned first, echoed on every response
//! - **Tracing** - request spans tagged with the request id
//! - **Admission** - payload guard, client key, credentials, rate limit (`/api` only)

use crate::api;
use crate::api::handlers::{live_handler, ready_handler};
use crate::api::middleware::{admission, request_id, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};

/// Constructs the application router with all routes and middleware.
///
/// Path normalization is applied by the server around this router so that
/// tests can wrap it with their own layers first.
pub fn app_router(state: AppState) -> Router {
    let api_router = api::routes::protected_routes()
        .layer(middleware::from_fn_with_state(state.clone(), admission::layer));

    Router::new()
        .route("/health", get(live_handler))
        .route("/health/live", get(live_handler))
        .route("/health/ready", get(ready_handler))
        .nest("/api", api_router)
        .with_state(state)
        .layer(tracing::layer())
        .layer(middleware::from_fn(request_id::layer))
}
