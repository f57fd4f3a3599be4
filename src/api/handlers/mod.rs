//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod archive;
pub mod echo;
pub mod health;

pub use archive::{delete_record_handler, list_records_handler, upsert_records_handler};
pub use echo::echo_handler;
pub use health::{live_handler, ready_handler};

use serde_json::{Value, json};

use crate::error::AppError;

/// Parses a buffered request body as JSON.
///
/// An empty body yields `None`. Handlers take raw bytes so that malformed
/// input renders the uniform error payload.
pub(crate) fn json_body(bytes: &[u8]) -> Result<Option<Value>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some).map_err(|e| {
        AppError::validation(
            "Request body must be valid JSON",
            json!({"reason": e.to_string()}),
        )
    })
}
