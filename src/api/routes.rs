//! API route configuration.
//!
//! Every route here sits behind the admission gate
//! ([`crate::api::middleware::admission`]).

use crate::api::handlers::{
    delete_record_handler, echo_handler, list_records_handler, upsert_records_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Protected API routes.
///
/// # Endpoints
///
/// - `POST   /echo`                 - Echo the submitted JSON
/// - `GET    /{collection}`         - List records (paginated)
/// - `POST   /{collection}`         - Upsert one record or a batch
/// - `DELETE /{collection}/{id}`    - Delete a record
///
/// `collection` is one of `news`, `minutes`, `segments`.
///
/// axum's default body limit is disabled here: bodies arrive already
/// buffered and capped at `MAX_REQUEST_BODY_BYTES` by the admission gate.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/echo", post(echo_handler))
        .route(
            "/{collection}",
            get(list_records_handler).post(upsert_records_handler),
        )
        .route("/{collection}/{id}", delete(delete_record_handler))
        .layer(DefaultBodyLimit::disable())
}
