//! Handlers for liveness and readiness endpoints.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, LiveResponse, ReadyChecks, ReadyResponse};
use crate::state::AppState;

/// Liveness probe. Never touches dependencies.
///
/// # Endpoint
///
/// `GET /health/live` (also `GET /health`)
pub async fn live_handler() -> Json<LiveResponse> {
    Json(LiveResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe with component checks.
///
/// # Endpoint
///
/// `GET /health/ready`
///
/// # Response Codes
///
/// - **200 OK**: every check passed
/// - **503 Service Unavailable**: at least one check failed
///
/// # Response
///
/// ```json
/// {
///   "status": "degraded",
///   "checks": {
///     "database": { "ok": true, "detail": "archive store reachable" },
///     "rate_limit_backend": { "ok": false, "detail": "redis backend unreachable" }
///   }
/// }
/// ```
pub async fn ready_handler(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, (StatusCode, Json<ReadyResponse>)> {
    let (database, rate_limit_backend) = tokio::join!(check_database(&state), async {
        CheckStatus::from(state.rate_limit().health().await)
    });

    let ready = database.ok && rate_limit_backend.ok;

    let response = ReadyResponse {
        status: if ready { "ok" } else { "degraded" },
        checks: ReadyChecks {
            database,
            rate_limit_backend,
        },
    };

    if ready {
        Ok(Json(response))
    } else {
        tracing::warn!("Readiness check failed");
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.archive.ping().await {
        Ok(()) => CheckStatus {
            ok: true,
            detail: Some("archive store reachable".to_string()),
        },
        Err(e) => CheckStatus {
            ok: false,
            detail: Some(format!("archive store error: {}", e)),
        },
    }
}
