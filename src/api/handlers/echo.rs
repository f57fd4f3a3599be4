//! Handler for the echo endpoint.

use axum::{Json, body::Bytes};
use serde_json::{Value, json};

use super::json_body;
use crate::error::AppError;

/// Returns the submitted JSON document.
///
/// # Endpoint
///
/// `POST /api/echo`
///
/// Useful for checking credentials and limits end to end. An empty body
/// echoes `{}`.
///
/// # Response
///
/// ```json
/// { "you_sent": { "hello": "world" } }
/// ```
pub async fn echo_handler(body: Bytes) -> Result<Json<Value>, AppError> {
    let payload = json_body(&body)?.unwrap_or_else(|| json!({}));
    Ok(Json(json!({ "you_sent": payload })))
}
