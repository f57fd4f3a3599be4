//! Ordered admission checks run before any `/api` handler.

use axum::{body::Body, extract::Request};
use serde_json::json;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::auth_service::AuthService;
use super::client_key_service::ClientKeyService;
use super::payload_guard::PayloadGuard;
use super::rate_limit_service::{RateLimitDecision, RateLimitService};
use crate::error::AppError;

/// Header read for the forwarded client chain.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Runs the admission checks in a fixed order and stops at the first
/// rejection:
///
/// 1. declared `Content-Length` against the body ceiling
/// 2. streamed body read against the same ceiling
/// 3. client key resolution (never fails)
/// 4. credential evaluation
/// 5. rate limiting
/// 6. batch cardinality
///
/// Steps 1, 2 and 6 only run for `POST`, `PUT` and `PATCH`. The pipeline
/// holds no per-request state and is shared behind an `Arc`.
pub struct AdmissionPipeline {
    client_keys: ClientKeyService,
    auth: AuthService,
    rate_limit: Arc<RateLimitService>,
    payload: PayloadGuard,
}

impl AdmissionPipeline {
    pub fn new(
        client_keys: ClientKeyService,
        auth: AuthService,
        rate_limit: Arc<RateLimitService>,
        payload: PayloadGuard,
    ) -> Self {
        Self {
            client_keys,
            auth,
            rate_limit,
            payload,
        }
    }

    pub fn rate_limit(&self) -> &Arc<RateLimitService> {
        &self.rate_limit
    }

    /// Admits or rejects `request` coming from `peer`.
    ///
    /// On success the request is returned with its body buffered and with
    /// [`ResolvedClient`](crate::domain::entities::ResolvedClient) and
    /// [`Principal`](crate::domain::entities::Principal) extensions attached.
    ///
    /// # Errors
    ///
    /// - `413 PAYLOAD_TOO_LARGE` for oversized bodies or batches
    /// - `400 BAD_REQUEST` / `VALIDATION_ERROR` for unusable bodies or headers
    /// - `401 UNAUTHORIZED` when credentials are missing or invalid
    /// - `429 RATE_LIMITED` when the client is over budget, or the limiter
    ///   fails closed
    pub async fn admit(&self, peer: Option<IpAddr>, request: Request) -> Result<Request, AppError> {
        let (mut parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let (buffered, passthrough) = if PayloadGuard::applies_to(&parts.method) {
            let declared = self
                .payload
                .check_declared_length(&parts.headers)
                .map_err(|e| rejected(e, &path))?;
            let bytes = self
                .payload
                .read_body(body, declared)
                .await
                .map_err(|e| rejected(e, &path))?;
            (Some(bytes), None)
        } else {
            (None, Some(body))
        };

        let client = self
            .client_keys
            .resolve(peer, parts.headers.get(FORWARDED_FOR_HEADER));

        let principal = match self.auth.authenticate(&parts.method, &parts.headers) {
            Ok(principal) => principal,
            Err(failure) => {
                warn!(
                    evaluator = failure.evaluator,
                    reason = %failure.error,
                    client = %client.key,
                    provenance = %client.provenance,
                    path = %path,
                    "Authentication failed"
                );
                return Err(rejected(
                    AppError::unauthorized("Unauthorized", json!({})),
                    &path,
                ));
            }
        };

        if let RateLimitDecision::Denied(reason) = self.rate_limit.admit(&client.key).await {
            debug!(
                client = %client.key,
                reason = reason.as_str(),
                path = %path,
                "Rate limit rejected request"
            );
            return Err(rejected(
                AppError::rate_limited(json!({
                    "reason": reason.as_str(),
                    "limit_per_minute": self.rate_limit.policy().requests_per_minute,
                    "backend": self.rate_limit.backend_name(),
                })),
                &path,
            ));
        }

        let body = match (buffered, passthrough) {
            (Some(bytes), _) => {
                self.payload
                    .check_batch(&bytes)
                    .map_err(|e| rejected(e, &path))?;
                Body::from(bytes)
            }
            (None, Some(body)) => body,
            (None, None) => Body::empty(),
        };

        parts.extensions.insert(client);
        parts.extensions.insert(principal);

        Ok(Request::from_parts(parts, body))
    }
}

fn rejected(error: AppError, path: &str) -> AppError {
    let code = error.code();
    metrics::counter!("admission_rejections_total", "code" => code).increment(1);
    debug!(code, path, "Request rejected at admission");
    error
}
