//! Proxy-aware client identity resolution.
//!
//! The rate limit key of a request is its peer address unless that peer is a
//! trusted proxy, in which case the real client is read from
//! `X-Forwarded-For`. Nothing here ever fails at request time: unusable input
//! falls back to the peer address, and a request with no address at all lands
//! in a fixed fallback bucket so it is still rate limited.

use axum::http::HeaderValue;
use ipnet::IpNet;
use std::net::{IpAddr, SocketAddr};

use crate::domain::entities::ResolvedClient;

/// Startup error for an invalid `TRUSTED_PROXY_CIDRS` entry.
#[derive(Debug, thiserror::Error)]
#[error("Invalid TRUSTED_PROXY_CIDRS entry: {0}")]
pub struct ProxyConfigError(pub String);

/// Immutable set of networks whose forwarded headers are honored.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    networks: Vec<IpNet>,
}

impl TrustedProxies {
    /// Parses CIDR ranges. Bare addresses are taken as single-host prefixes;
    /// blank entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyConfigError`] for the first entry that is neither a
    /// CIDR range nor an address.
    pub fn parse<I, S>(entries: I) -> Result<Self, ProxyConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut networks = Vec::new();
        for raw in entries {
            let value = raw.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            let network = match value.parse::<IpNet>() {
                Ok(net) => net.trunc(),
                Err(_) => value
                    .parse::<IpAddr>()
                    .map(IpNet::from)
                    .map_err(|_| ProxyConfigError(value.to_string()))?,
            };
            networks.push(network);
        }
        Ok(Self { networks })
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Tests membership. IPv4-mapped IPv6 addresses match IPv4 ranges.
    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.networks.iter().any(|net| net.contains(&addr))
    }
}

/// Parses one `X-Forwarded-For` entry.
///
/// Accepts `1.2.3.4`, `1.2.3.4:8080`, `2001:db8::1`, `[2001:db8::1]`,
/// `[2001:db8::1]:443`, optionally wrapped in double quotes. Anything else
/// yields `None`.
pub fn parse_forwarded_entry(entry: &str) -> Option<IpAddr> {
    let value = entry.trim().trim_matches('"').trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(addr) = value.parse::<IpAddr>() {
        return Some(addr.to_canonical());
    }
    if let Ok(socket) = value.parse::<SocketAddr>() {
        return Some(socket.ip().to_canonical());
    }
    value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<IpAddr>().ok())
        .map(|addr| addr.to_canonical())
}

/// Derives the rate limit key of a request.
#[derive(Debug, Clone)]
pub struct ClientKeyService {
    trusted: TrustedProxies,
    fallback_key: String,
}

impl ClientKeyService {
    pub fn new(trusted: TrustedProxies, fallback_key: impl Into<String>) -> Self {
        Self {
            trusted,
            fallback_key: fallback_key.into(),
        }
    }

    pub fn trusted_proxies(&self) -> &TrustedProxies {
        &self.trusted
    }

    /// Resolves the client of a request.
    ///
    /// # Arguments
    ///
    /// - `peer` - immediate peer address, `None` when the transport gave none
    /// - `forwarded_for` - raw `X-Forwarded-For` header value, if any
    ///
    /// # Resolution
    ///
    /// 1. No peer: the fallback bucket.
    /// 2. Untrusted peer: the peer; the header is ignored.
    /// 3. Trusted peer: the header is walked right to left, skipping
    ///    unparsable entries and trusted hops; the first untrusted address
    ///    wins. If none is found the peer is used.
    pub fn resolve(&self, peer: Option<IpAddr>, forwarded_for: Option<&HeaderValue>) -> ResolvedClient {
        let Some(peer) = peer.map(|p| p.to_canonical()) else {
            return ResolvedClient::fallback(self.fallback_key.clone());
        };

        if !self.trusted.contains(peer) {
            return ResolvedClient::direct(peer);
        }

        let Some(chain) = forwarded_for.and_then(|v| v.to_str().ok()) else {
            return ResolvedClient::direct(peer);
        };

        chain
            .rsplit(',')
            .filter_map(parse_forwarded_entry)
            .find(|addr| !self.trusted.contains(*addr))
            .map(ResolvedClient::forwarded)
            .unwrap_or_else(|| ResolvedClient::direct(peer))
    }
}
