#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::extract::connect_info::MockConnectInfo;
use axum_test::TestServer;
use chrono::Utc;
use civic_archive_api::config::Config;
use civic_archive_api::infrastructure::persistence::MemoryArchiveRepository;
use civic_archive_api::infrastructure::rate_limit::{
    MemoryBackend, RateLimitBackend, RateLimitError, RateLimitResult,
};
use civic_archive_api::routes::app_router;
use civic_archive_api::server::build_pipeline;
use civic_archive_api::state::AppState;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const API_KEY: &str = "test-archive-key";
pub const JWT_SECRET: &str = "0123456789abcdef0123456789abcdef";

pub fn peer() -> SocketAddr {
    "198.51.100.7:40000".parse().unwrap()
}

/// Open configuration: no credentials, no rate limit.
pub fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        log_level: "info".to_string(),
        log_format: "text".to_string(),
        app_env: "test".to_string(),
        security_strict_mode: false,
        require_api_key: false,
        api_key: Some(API_KEY.to_string()),
        require_jwt: false,
        jwt_secret: Some(JWT_SECRET.to_string()),
        jwt_algorithm: "HS256".to_string(),
        jwt_leeway_seconds: 0,
        jwt_audience: None,
        jwt_issuer: None,
        jwt_scope_read: "archive:read".to_string(),
        jwt_scope_write: "archive:write".to_string(),
        jwt_scope_delete: "archive:delete".to_string(),
        jwt_admin_role: "admin".to_string(),
        rate_limit_per_minute: 0,
        rate_limit_backend: "memory".to_string(),
        redis_url: None,
        rate_limit_redis_prefix: "civic_archive:rate_limit".to_string(),
        rate_limit_redis_window_seconds: 65,
        rate_limit_failure_cooldown_seconds: 5,
        rate_limit_backend_timeout_ms: 200,
        rate_limit_fail_open: true,
        rate_limit_fallback_key: "unknown-client".to_string(),
        trusted_proxy_cidrs: Vec::new(),
        max_request_body_bytes: 1_048_576,
        ingest_max_batch_items: 200,
    }
}

pub fn create_test_state(config: &Config, backend: Arc<dyn RateLimitBackend>) -> AppState {
    config.validate().unwrap();
    let pipeline = build_pipeline(config, backend).unwrap();
    AppState::new(
        Arc::new(pipeline),
        Arc::new(MemoryArchiveRepository::new()),
    )
}

/// Full application router as seen from `peer`.
pub fn create_app(config: &Config, backend: Arc<dyn RateLimitBackend>, peer: SocketAddr) -> Router {
    app_router(create_test_state(config, backend)).layer(MockConnectInfo(peer))
}

pub fn create_server(config: &Config) -> TestServer {
    TestServer::new(create_app(config, Arc::new(MemoryBackend::new()), peer())).unwrap()
}

pub fn create_server_with_backend(config: &Config, backend: Arc<dyn RateLimitBackend>) -> TestServer {
    TestServer::new(create_app(config, backend, peer())).unwrap()
}

/// HS256 token signed with [`JWT_SECRET`], valid for five minutes.
pub fn mint_token(sub: &str, extra: Value) -> String {
    let mut claims = serde_json::json!({
        "sub": sub,
        "exp": Utc::now().timestamp() + 300,
    });
    if let (Some(claims), Some(extra)) = (claims.as_object_mut(), extra.as_object()) {
        claims.extend(extra.clone());
    }
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Backend whose every call fails, counting attempts.
#[derive(Default)]
pub struct FailingBackend {
    pub increments: AtomicUsize,
}

impl FailingBackend {
    pub fn calls(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimitBackend for FailingBackend {
    async fn increment(&self, _key: &str, _window: Duration) -> RateLimitResult<u64> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        Err(RateLimitError::Connection("connection refused".to_string()))
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
