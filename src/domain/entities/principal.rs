//! Verified caller identity produced by the credential evaluators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Claims carried by a verified bearer token.
///
/// `sub` and `exp` are mandatory; everything else (`aud`, `iss`, `scope`,
/// `roles`, ...) is kept in `extra` and read through the helpers below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Granted scopes from `scope` (space separated) and `scopes`.
    pub fn scopes(&self) -> BTreeSet<String> {
        self.values_for(&["scope", "scopes"])
    }

    /// Granted roles from `role` and `roles`.
    pub fn roles(&self) -> BTreeSet<String> {
        self.values_for(&["role", "roles"])
    }

    /// Collects string values under `keys`.
    ///
    /// Strings are trimmed and, for the `scope` claim only, split on
    /// whitespace. Lists contribute each non-blank string item; any other
    /// JSON type is ignored.
    fn values_for(&self, keys: &[&str]) -> BTreeSet<String> {
        let mut values = BTreeSet::new();
        for key in keys {
            match self.extra.get(*key) {
                Some(Value::String(raw)) if *key == "scope" => {
                    values.extend(raw.split_whitespace().map(str::to_string));
                }
                Some(Value::String(raw)) => {
                    let trimmed = raw.trim();
                    if !trimmed.is_empty() {
                        values.insert(trimmed.to_string());
                    }
                }
                Some(Value::Array(items)) => {
                    values.extend(
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    );
                }
                _ => {}
            }
        }
        values
    }
}

/// Which credentials a request was admitted with.
///
/// Empty when no evaluator is enabled (anonymous access).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    pub api_key_verified: bool,
    pub claims: Option<TokenClaims>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        !self.api_key_verified && self.claims.is_none()
    }

    /// Token subject, when a token was verified.
    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.sub.as_str())
    }
}
