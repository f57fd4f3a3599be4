//! Credential evaluation and composition.
//!
//! Each enabled [`CredentialEvaluator`] checks one kind of credential; a
//! [`CompositionStrategy`] turns their verdicts into a single decision. The
//! only strategy shipped is [`RequireAll`].

use axum::http::{HeaderMap, Method};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::entities::{Principal, TokenClaims};

/// Why a credential check failed.
///
/// Never shown to callers; every variant becomes the same 401.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing X-API-Key header")]
    MissingApiKey,

    #[error("API key mismatch")]
    ApiKeyMismatch,

    #[error("missing Authorization header")]
    MissingBearer,

    #[error("malformed Authorization header")]
    MalformedAuthorization,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token lacks required scope '{required}'")]
    InsufficientScope { required: String },
}

/// A credential that passed verification.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    ApiKey,
    Token(TokenClaims),
}

/// Checks one credential type against request headers.
pub trait CredentialEvaluator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn evaluate(&self, method: &Method, headers: &HeaderMap) -> Result<Credential, AuthError>;
}

/// Combines the verdicts of several evaluators.
pub trait CompositionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs `evaluators` and returns the credentials that admitted the
    /// request, or the failure that rejected it.
    fn combine(
        &self,
        evaluators: &[Arc<dyn CredentialEvaluator>],
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<Vec<Credential>, AuthFailure>;
}

/// A rejection together with the evaluator that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub evaluator: &'static str,
    pub error: AuthError,
}

/// AND composition: every evaluator must pass. Stops at the first failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireAll;

impl CompositionStrategy for RequireAll {
    fn name(&self) -> &'static str {
        "require_all"
    }

    fn combine(
        &self,
        evaluators: &[Arc<dyn CredentialEvaluator>],
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<Vec<Credential>, AuthFailure> {
        evaluators
            .iter()
            .map(|evaluator| {
                evaluator
                    .evaluate(method, headers)
                    .map_err(|error| AuthFailure {
                        evaluator: evaluator.name(),
                        error,
                    })
            })
            .collect()
    }
}

/// Runs the configured evaluators under a composition strategy.
///
/// # Example
///
/// ```rust,ignore
/// let auth = AuthService::new(
///     vec![Arc::new(ApiKeyEvaluator::new("key")), Arc::new(JwtEvaluator::new(settings))],
///     Arc::new(RequireAll),
/// );
/// let principal = auth.authenticate(req.method(), req.headers())?;
/// ```
pub struct AuthService {
    evaluators: Vec<Arc<dyn CredentialEvaluator>>,
    strategy: Arc<dyn CompositionStrategy>,
}

impl AuthService {
    pub fn new(
        evaluators: Vec<Arc<dyn CredentialEvaluator>>,
        strategy: Arc<dyn CompositionStrategy>,
    ) -> Self {
        Self {
            evaluators,
            strategy,
        }
    }

    /// Service with no evaluators; every request is anonymous.
    pub fn disabled() -> Self {
        Self::new(Vec::new(), Arc::new(RequireAll))
    }

    pub fn is_enabled(&self) -> bool {
        !self.evaluators.is_empty()
    }

    /// Names of the active evaluators, in evaluation order.
    pub fn evaluator_names(&self) -> Vec<&'static str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// Decides whether the request carries acceptable credentials.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthFailure`] chosen by the strategy. Callers must not
    /// expose its contents to the client.
    pub fn authenticate(&self, method: &Method, headers: &HeaderMap) -> Result<Principal, AuthFailure> {
        if self.evaluators.is_empty() {
            return Ok(Principal::anonymous());
        }

        let credentials = self.strategy.combine(&self.evaluators, method, headers)?;

        let mut principal = Principal::anonymous();
        for credential in credentials {
            match credential {
                Credential::ApiKey => principal.api_key_verified = true,
                Credential::Token(claims) => principal.claims = Some(claims),
            }
        }
        Ok(principal)
    }
}
