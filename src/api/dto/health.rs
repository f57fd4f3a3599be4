//! DTOs for health endpoints.

use serde::Serialize;

use crate::application::services::BackendHealth;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness response with component checks.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// `ok` when every check passes, otherwise `degraded`.
    pub status: &'static str,
    pub checks: ReadyChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadyChecks {
    pub database: CheckStatus,
    pub rate_limit_backend: CheckStatus,
}

/// Individual component health status.
#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<BackendHealth> for CheckStatus {
    fn from(health: BackendHealth) -> Self {
        Self {
            ok: health.ok,
            detail: health.detail,
        }
    }
}
