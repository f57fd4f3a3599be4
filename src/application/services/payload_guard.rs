//! Request body size and batch cardinality limits.

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, header},
};
use futures_util::StreamExt;
use serde_json::{Value, json};

use crate::error::AppError;

/// Enforces `MAX_REQUEST_BODY_BYTES` and `INGEST_MAX_BATCH_ITEMS` on write
/// requests.
#[derive(Debug, Clone, Copy)]
pub struct PayloadGuard {
    max_body_bytes: usize,
    max_batch_items: usize,
}

impl PayloadGuard {
    pub fn new(max_body_bytes: usize, max_batch_items: usize) -> Self {
        Self {
            max_body_bytes,
            max_batch_items,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn max_batch_items(&self) -> usize {
        self.max_batch_items
    }

    /// Only methods that carry an ingest body are guarded.
    pub fn applies_to(method: &Method) -> bool {
        matches!(*method, Method::POST | Method::PUT | Method::PATCH)
    }

    /// Checks the declared `Content-Length` before any byte is read.
    ///
    /// Returns the declared length, if present.
    ///
    /// # Errors
    ///
    /// - [`AppError::BadRequest`] when the header is not a non-negative integer
    /// - [`AppError::PayloadTooLarge`] when it exceeds the ceiling
    pub fn check_declared_length(&self, headers: &HeaderMap) -> Result<Option<u64>, AppError> {
        let Some(raw) = headers.get(header::CONTENT_LENGTH) else {
            return Ok(None);
        };

        let declared = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                AppError::bad_request(
                    "Invalid Content-Length header",
                    json!({"content_length": String::from_utf8_lossy(raw.as_bytes())}),
                )
            })?;

        if declared > self.max_body_bytes as u64 {
            return Err(AppError::payload_too_large(json!({
                "max_request_body_bytes": self.max_body_bytes,
                "content_length": declared,
            })));
        }

        Ok(Some(declared))
    }

    /// Reads the body, aborting as soon as the running total passes the
    /// ceiling.
    ///
    /// A declared length is not trusted; the stream is counted regardless.
    ///
    /// # Errors
    ///
    /// - [`AppError::PayloadTooLarge`] once the ceiling is crossed
    /// - [`AppError::BadRequest`] when the stream fails (client went away)
    pub async fn read_body(&self, body: Body, declared: Option<u64>) -> Result<Bytes, AppError> {
        let capacity = declared.map_or(0, |d| d as usize).min(self.max_body_bytes);
        let mut buffer = Vec::with_capacity(capacity);
        let mut stream = body.into_data_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::bad_request(
                    "Failed to read request body",
                    json!({"reason": e.to_string()}),
                )
            })?;

            if buffer.len() + chunk.len() > self.max_body_bytes {
                let mut details = json!({
                    "max_request_body_bytes": self.max_body_bytes,
                    "request_body_bytes": buffer.len() + chunk.len(),
                });
                if let Some(declared) = declared {
                    details["content_length"] = json!(declared);
                }
                return Err(AppError::payload_too_large(details));
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(Bytes::from(buffer))
    }

    /// Rejects batches over the item ceiling.
    ///
    /// An empty (or whitespace-only) body passes; any other body must be
    /// JSON. Objects and scalars count as a single item.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] when the body is not JSON
    /// - [`AppError::PayloadTooLarge`] when an array exceeds the ceiling
    pub fn check_batch(&self, body: &[u8]) -> Result<(), AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let value: Value = serde_json::from_slice(body).map_err(|e| {
            AppError::validation(
                "Request body must be valid JSON",
                json!({"reason": e.to_string()}),
            )
        })?;

        if let Value::Array(items) = &value
            && items.len() > self.max_batch_items
        {
            return Err(AppError::payload_too_large(json!({
                "max_batch_items": self.max_batch_items,
                "received_batch_items": items.len(),
            })));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use futures_util::stream;

    fn guard() -> PayloadGuard {
        PayloadGuard::new(16, 3)
    }

    fn content_length(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_applies_to_write_methods_only() {
        assert!(PayloadGuard::applies_to(&Method::POST));
        assert!(PayloadGuard::applies_to(&Method::PUT));
        assert!(PayloadGuard::applies_to(&Method::PATCH));
        assert!(!PayloadGuard::applies_to(&Method::GET));
        assert!(!PayloadGuard::applies_to(&Method::DELETE));
    }

    #[test]
    fn test_declared_length_at_and_over_limit() {
        assert_eq!(guard().check_declared_length(&content_length("16")).unwrap(), Some(16));
        assert_eq!(guard().check_declared_length(&HeaderMap::new()).unwrap(), None);

        let err = guard().check_declared_length(&content_length("17")).unwrap_err();
        let body = err.to_body();
        assert_eq!(body.code, "PAYLOAD_TOO_LARGE");
        assert_eq!(body.details["max_request_body_bytes"], 16);
        assert_eq!(body.details["content_length"], 17);
    }

    #[test]
    fn test_declared_length_not_numeric() {
        for raw in ["abc", "-1", "1.5", ""] {
            let err = guard().check_declared_length(&content_length(raw)).unwrap_err();
            assert_eq!(err.code(), "BAD_REQUEST", "{raw:?}");
        }
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let bytes = guard().read_body(Body::from("0123456789abcdef"), Some(16)).await.unwrap();
        assert_eq!(bytes.len(), 16);
    }

    #[tokio::test]
    async fn test_read_body_aborts_when_stream_exceeds_declared() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"0123456789")),
            Ok(Bytes::from_static(b"0123456789")),
            Ok(Bytes::from_static(b"never read")),
        ];
        let body = Body::from_stream(stream::iter(chunks));

        let err = guard().read_body(body, Some(4)).await.unwrap_err();
        let body = err.to_body();
        assert_eq!(body.code, "PAYLOAD_TOO_LARGE");
        assert_eq!(body.details["request_body_bytes"], 20);
        assert_eq!(body.details["content_length"], 4);
    }

    #[tokio::test]
    async fn test_read_body_without_declared_length_omits_it() {
        let err = guard()
            .read_body(Body::from(vec![b'x'; 17]), None)
            .await
            .unwrap_err();
        let body = err.to_body();
        assert!(body.details.get("content_length").is_none());
    }

    #[tokio::test]
    async fn test_read_body_stream_error() {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Err(std::io::Error::other("connection reset"))];
        let err = guard()
            .read_body(Body::from_stream(stream::iter(chunks)), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn test_batch_exactly_at_limit_and_one_over() {
        assert!(guard().check_batch(b"[1,2,3]").is_ok());

        let err = guard().check_batch(b"[1,2,3,4]").unwrap_err();
        let body = err.to_body();
        assert_eq!(body.code, "PAYLOAD_TOO_LARGE");
        assert_eq!(body.details["max_batch_items"], 3);
        assert_eq!(body.details["received_batch_items"], 4);
    }

    #[test]
    fn test_batch_non_array_and_empty() {
        assert!(guard().check_batch(b"{\"a\":1}").is_ok());
        assert!(guard().check_batch(b"").is_ok());
        assert!(guard().check_batch(b" \n").is_ok());
    }

    #[test]
    fn test_batch_rejects_non_json() {
        let err = guard().check_batch(b"not json").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
