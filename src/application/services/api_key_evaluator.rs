//! Static API key credential check.

use axum::http::{HeaderMap, Method};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::auth_service::{AuthError, Credential, CredentialEvaluator};

/// Header carrying the static key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Checks `X-API-Key` against the configured key.
///
/// Both values are hashed with SHA-256 before comparison so the constant-time
/// equality never sees inputs of different length.
pub struct ApiKeyEvaluator {
    expected_digest: [u8; 32],
}

impl ApiKeyEvaluator {
    /// Creates an evaluator for `api_key`.
    ///
    /// The raw key is not retained.
    pub fn new(api_key: &str) -> Self {
        Self {
            expected_digest: Sha256::digest(api_key.as_bytes()).into(),
        }
    }
}

impl CredentialEvaluator for ApiKeyEvaluator {
    fn name(&self) -> &'static str {
        "api_key"
    }

    fn evaluate(&self, _method: &Method, headers: &HeaderMap) -> Result<Credential, AuthError> {
        let provided = headers
            .get(API_KEY_HEADER)
            .ok_or(AuthError::MissingApiKey)?;

        let provided_digest = Sha256::digest(provided.as_bytes());
        if bool::from(provided_digest.as_slice().ct_eq(&self.expected_digest[..])) {
            Ok(Credential::ApiKey)
        } else {
            Err(AuthError::ApiKeyMismatch)
        }
    }
}
