//! Resolved client identity used as the rate limit key.

use std::fmt;
use std::net::IpAddr;

/// Where the rate limit key of a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientProvenance {
    /// The immediate peer address, either because the peer is not a trusted
    /// proxy or because its forwarded header carried nothing usable.
    Direct,
    /// An address taken from `X-Forwarded-For` behind a trusted proxy.
    TrustedProxyForwarded,
    /// No address was available; the configured fallback bucket is used.
    Fallback,
}

impl ClientProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::TrustedProxyForwarded => "trusted-proxy-forwarded",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ClientProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client identity computed once per request.
///
/// Inserted into the request extensions by the admission middleware so
/// handlers and logs can see which key a request was counted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClient {
    pub address: Option<IpAddr>,
    pub key: String,
    pub provenance: ClientProvenance,
}

impl ResolvedClient {
    pub fn direct(address: IpAddr) -> Self {
        Self {
            address: Some(address),
            key: address.to_string(),
            provenance: ClientProvenance::Direct,
        }
    }

    pub fn forwarded(address: IpAddr) -> Self {
        Self {
            address: Some(address),
            key: address.to_string(),
            provenance: ClientProvenance::TrustedProxyForwarded,
        }
    }

    pub fn fallback(key: impl Into<String>) -> Self {
        Self {
            address: None,
            key: key.into(),
            provenance: ClientProvenance::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_key_is_address() {
        let client = ResolvedClient::direct("203.0.113.7".parse().unwrap());
        assert_eq!(client.key, "203.0.113.7");
        assert_eq!(client.provenance.as_str(), "direct");
    }

    #[test]
    fn test_fallback_has_no_address() {
        let client = ResolvedClient::fallback("unknown-client");
        assert!(client.address.is_none());
        assert_eq!(client.provenance, ClientProvenance::Fallback);
        assert_eq!(client.provenance.to_string(), "fallback");
    }
}
