//! HTTP server initialization and runtime setup.
//!
//! Builds the rate limit backend, credential evaluators and admission
//! pipeline from configuration, then runs the Axum server until a shutdown
//! signal arrives.

use crate::application::services::{
    AdmissionPipeline, ApiKeyEvaluator, AuthService, ClientKeyService, CredentialEvaluator,
    JwtEvaluator, PayloadGuard, RateLimitService, RequireAll,
};
use crate::config::Config;
use crate::infrastructure::persistence::MemoryArchiveRepository;
use crate::infrastructure::rate_limit::{MemoryBackend, RateLimitBackend, RedisBackend};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

/// Creates the rate limit backend selected by `RATE_LIMIT_BACKEND`.
///
/// The Redis backend connects lazily, so an unreachable Redis does not stop
/// startup.
///
/// # Errors
///
/// Returns an error if the Redis URL is missing or malformed.
pub fn build_rate_limit_backend(config: &Config) -> Result<Arc<dyn RateLimitBackend>> {
    match config.rate_limit_backend.as_str() {
        "redis" => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("RATE_LIMIT_BACKEND=redis requires a Redis URL")?;
            let backend = RedisBackend::new(
                redis_url,
                config.rate_limit_redis_prefix.clone(),
                config.rate_limit_redis_window_seconds,
                Duration::from_millis(config.rate_limit_backend_timeout_ms),
            )?;
            tracing::info!("Rate limit backend: redis");
            Ok(Arc::new(backend))
        }
        _ => {
            tracing::info!("Rate limit backend: memory");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}

/// Creates the credential evaluators enabled by configuration.
///
/// The API key check runs before the token check.
///
/// # Errors
///
/// Returns an error if an enabled evaluator lacks its secret.
pub fn build_auth_service(config: &Config) -> Result<AuthService> {
    let mut evaluators: Vec<Arc<dyn CredentialEvaluator>> = Vec::new();

    if config.require_api_key {
        let api_key = config
            .api_key
            .as_deref()
            .context("REQUIRE_API_KEY is enabled but API_KEY is not set")?;
        evaluators.push(Arc::new(ApiKeyEvaluator::new(api_key)));
    }

    if config.require_jwt {
        let settings = config
            .jwt_settings()
            .context("REQUIRE_JWT is enabled but JWT_SECRET is not set")?;
        evaluators.push(Arc::new(JwtEvaluator::new(settings)));
    }

    let auth = AuthService::new(evaluators, Arc::new(RequireAll));
    if auth.is_enabled() {
        tracing::info!("Credential checks: {}", auth.evaluator_names().join(" + "));
    } else {
        tracing::warn!("No credential checks enabled; /api is open to anonymous callers");
    }
    Ok(auth)
}

/// Builds the admission pipeline with the given backend.
///
/// # Errors
///
/// Returns an error for invalid trusted proxy entries or missing secrets.
pub fn build_pipeline(
    config: &Config,
    backend: Arc<dyn RateLimitBackend>,
) -> Result<AdmissionPipeline> {
    let client_keys = ClientKeyService::new(
        config.trusted_proxies()?,
        config.rate_limit_fallback_key.clone(),
    );
    let rate_limit = Arc::new(RateLimitService::new(backend, config.rate_limit_policy()));
    let payload = PayloadGuard::new(config.max_request_body_bytes, config.ingest_max_batch_items);

    Ok(AdmissionPipeline::new(
        client_keys,
        build_auth_service(config)?,
        rate_limit,
        payload,
    ))
}

/// Builds the full application state from configuration.
///
/// # Errors
///
/// See [`build_rate_limit_backend`] and [`build_pipeline`].
pub fn build_state(config: &Config) -> Result<AppState> {
    let backend = build_rate_limit_backend(config)?;
    let pipeline = build_pipeline(config, backend)?;
    let archive = Arc::new(MemoryArchiveRepository::new());

    Ok(AppState::new(Arc::new(pipeline), archive))
}

/// Runs the HTTP server with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - State construction fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let state = build_state(&config)?;

    let app = NormalizePathLayer::trim_trailing_slash().layer(app_router(state));

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
