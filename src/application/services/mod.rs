//! Admission services for the application layer.

pub mod admission_pipeline;
pub mod api_key_evaluator;
pub mod auth_service;
pub mod client_key_service;
pub mod jwt_evaluator;
pub mod payload_guard;
pub mod rate_limit_service;

pub use admission_pipeline::AdmissionPipeline;
pub use api_key_evaluator::ApiKeyEvaluator;
pub use auth_service::{
    AuthError, AuthFailure, AuthService, CompositionStrategy, Credential, CredentialEvaluator,
    RequireAll,
};
pub use client_key_service::{ClientKeyService, ProxyConfigError, TrustedProxies};
pub use jwt_evaluator::{JwtEvaluator, JwtSettings, ScopePolicy};
pub use payload_guard::PayloadGuard;
pub use rate_limit_service::{
    BackendHealth, DenyReason, RateLimitDecision, RateLimitPolicy, RateLimitService,
};
