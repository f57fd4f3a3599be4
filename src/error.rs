//! Uniform error type and JSON rejection payload.
//!
//! Every failure leaving the service, whether an admission rejection or a
//! handler error, renders the same body:
//!
//! ```json
//! {
//!   "code": "RATE_LIMITED",
//!   "message": "Too Many Requests",
//!   "error": "Too Many Requests",
//!   "request_id": "5f0c...",
//!   "details": { "limit_per_minute": 5 }
//! }
//! ```

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::api::middleware::request_id;

/// Serialized error payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    /// Mirrors `message` for clients that read the older field name.
    pub error: String,
    pub request_id: Option<String>,
    pub details: Value,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String, details: Value },
    Validation { message: String, details: Value },
    Unauthorized { message: String, details: Value },
    NotFound { message: String, details: Value },
    PayloadTooLarge { message: String, details: Value },
    RateLimited { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::BadRequest {
            message: message.into(),
            details,
        }
    }
    pub fn validation(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn payload_too_large(details: Value) -> Self {
        Self::PayloadTooLarge {
            message: "Payload Too Large".to_string(),
            details,
        }
    }
    pub fn rate_limited(details: Value) -> Self {
        Self::RateLimited {
            message: "Too Many Requests".to_string(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code carried in the payload.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { .. } => "BAD_REQUEST",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Unauthorized { .. } => "UNAUTHORIZED",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    fn into_parts(self) -> (String, Value) {
        match self {
            AppError::BadRequest { message, details }
            | AppError::Validation { message, details }
            | AppError::Unauthorized { message, details }
            | AppError::NotFound { message, details }
            | AppError::PayloadTooLarge { message, details }
            | AppError::RateLimited { message, details }
            | AppError::Internal { message, details } => (message, details),
        }
    }

    /// Builds the payload, picking up the request id of the current request.
    pub fn to_body(self) -> ErrorBody {
        let code = self.code();
        let (message, details) = self.into_parts();
        ErrorBody {
            code,
            error: message.clone(),
            message,
            request_id: request_id::current(),
            details,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            AppError::BadRequest { message, .. }
            | AppError::Validation { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::PayloadTooLarge { message, .. }
            | AppError::RateLimited { message, .. }
            | AppError::Internal { message, .. } => message,
        };
        write!(f, "{}: {}", self.code(), message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let unauthorized = matches!(self, AppError::Unauthorized { .. });
        let body = self.to_body();

        let mut response = (status, Json(body)).into_response();
        if unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or_else(|_| json!({}));
        AppError::validation("Request validation failed", details)
    }
}
