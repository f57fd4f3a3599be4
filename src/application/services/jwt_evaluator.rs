//! Bearer token (HS256 JWT) credential check.

use axum::http::{HeaderMap, Method, header};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};

use super::auth_service::{AuthError, Credential, CredentialEvaluator};
use crate::domain::entities::TokenClaims;

/// Scopes required per HTTP method, plus the role that skips the check.
///
/// An empty scope disables the check for its methods.
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    pub read: String,
    pub write: String,
    pub delete: String,
    pub admin_role: String,
}

impl ScopePolicy {
    /// Scope a token needs to call `method`, if any.
    ///
    /// `GET`/`HEAD` need read, `POST`/`PUT`/`PATCH` need write, `DELETE`
    /// needs delete. Other methods are not checked.
    pub fn required_for(&self, method: &Method) -> Option<&str> {
        let scope = match *method {
            Method::GET | Method::HEAD => &self.read,
            Method::POST | Method::PUT | Method::PATCH => &self.write,
            Method::DELETE => &self.delete,
            _ => return None,
        };
        let scope = scope.trim();
        (!scope.is_empty()).then_some(scope)
    }
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self {
            read: "archive:read".to_string(),
            write: "archive:write".to_string(),
            delete: "archive:delete".to_string(),
            admin_role: "admin".to_string(),
        }
    }
}

/// Token verification settings.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub leeway_seconds: u64,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    pub scopes: ScopePolicy,
}

/// Verifies `Authorization: Bearer <jwt>`.
///
/// Only HS256 is accepted. `sub` and `exp` must be present; `exp` and `nbf`
/// are checked with the configured leeway; `aud` and `iss` only when
/// configured. A token carrying the admin role skips the scope check.
pub struct JwtEvaluator {
    key: DecodingKey,
    validation: Validation,
    scopes: ScopePolicy,
}

impl JwtEvaluator {
    pub fn new(settings: JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = settings.leeway_seconds;
        validation.validate_nbf = true;

        match settings.audience.as_deref().filter(|a| !a.is_empty()) {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = settings.issuer.as_deref().filter(|i| !i.is_empty()) {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            scopes: settings.scopes,
        }
    }

    fn check_scope(&self, method: &Method, claims: &TokenClaims) -> Result<(), AuthError> {
        let Some(required) = self.scopes.required_for(method) else {
            return Ok(());
        };

        let admin_role = self.scopes.admin_role.trim();
        if !admin_role.is_empty() && claims.roles().contains(admin_role) {
            return Ok(());
        }

        if claims.scopes().contains(required) {
            Ok(())
        } else {
            Err(AuthError::InsufficientScope {
                required: required.to_string(),
            })
        }
    }
}

/// Extracts the token from an `Authorization` header.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingBearer)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::MalformedAuthorization)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedAuthorization)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedAuthorization);
    }
    Ok(token)
}

impl CredentialEvaluator for JwtEvaluator {
    fn name(&self) -> &'static str {
        "jwt"
    }

    fn evaluate(&self, method: &Method, headers: &HeaderMap) -> Result<Credential, AuthError> {
        let token = bearer_token(headers)?;

        let claims = decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "token expired".to_string(),
                    ErrorKind::ImmatureSignature => "token not yet valid".to_string(),
                    ErrorKind::InvalidAudience => "audience mismatch".to_string(),
                    ErrorKind::InvalidIssuer => "issuer mismatch".to_string(),
                    ErrorKind::InvalidSignature => "bad signature".to_string(),
                    ErrorKind::InvalidAlgorithm => "algorithm not allowed".to_string(),
                    ErrorKind::MissingRequiredClaim(claim) => format!("missing claim {}", claim),
                    _ => e.to_string(),
                };
                AuthError::InvalidToken(reason)
            })?
            .claims;

        self.check_scope(method, &claims)?;

        Ok(Credential::Token(claims))
    }
}
