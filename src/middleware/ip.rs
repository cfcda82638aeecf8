//! Client IP resolution.
//!
//! Every request gets one "real" client address, derived in this order
//! (first match wins):
//!
//! 1. `X-Forwarded-For`: first entry of the comma-separated chain, trimmed
//! 2. `X-Real-IP`: the whole value, trimmed
//! 3. the transport peer address (`ConnectInfo<SocketAddr>`), or `""`
//!
//! [`ClientIpLayer`] stores the result as a [`ClientIp`] request extension
//! before the handler runs, so rate limiting and handlers read the same value
//! without recomputing it.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! **Forwarding headers are client-controlled.** Values are not validated as
//! addresses and are accepted as-is. Unless the edge proxy overwrites them,
//! a client can pick its own rate limit key:
//!
//! ```nginx
//! # nginx example - overwrites any client-provided header
//! proxy_set_header X-Real-IP $remote_addr;
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```
//!
//! Setting `TRUSTED_PROXIES` narrows this: headers are then honoured only
//! when the transport peer belongs to one of the listed networks, and other
//! requests are keyed by their peer address.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request};
use ipnet::IpNet;
use tower::{Layer, Service};
use tracing::{debug, warn};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

// =============================================================================
// Header Parsing
// =============================================================================

/// Where the resolved address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source<'a> {
    ForwardedFor(&'a str),
    RealIp(&'a str),
    Peer(IpAddr),
    Unknown,
}

impl Source<'_> {
    fn into_string(self) -> String {
        match self {
            Source::ForwardedFor(ip) | Source::RealIp(ip) => ip.to_string(),
            Source::Peer(ip) => ip.to_string(),
            Source::Unknown => String::new(),
        }
    }
}

/// Non-empty, visible-ASCII value of `name`.
#[inline]
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

#[inline]
fn from_headers(headers: &HeaderMap) -> Option<Source<'_>> {
    if let Some(chain) = header_str(headers, X_FORWARDED_FOR)
        && let Some(first) = chain.split(',').next()
    {
        return Some(Source::ForwardedFor(first.trim()));
    }

    header_str(headers, X_REAL_IP).map(|value| Source::RealIp(value.trim()))
}

// =============================================================================
// Trusted Proxies
// =============================================================================

/// Networks whose forwarding headers are believed.
///
/// Empty means every peer is trusted, which is the plain header-first
/// resolution order.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    networks: Vec<IpNet>,
}

impl TrustedProxies {
    /// Parse IPs and CIDR ranges. Invalid entries are logged and skipped.
    pub fn new(entries: &[String]) -> Self {
        let networks: Vec<IpNet> = entries
            .iter()
            .filter_map(|entry| {
                let entry = entry.trim();
                let parsed = entry
                    .parse::<IpNet>()
                    .or_else(|_| entry.parse::<IpAddr>().map(IpNet::from));
                match parsed {
                    Ok(net) => Some(net),
                    Err(e) => {
                        warn!(entry = %entry, error = %e, "Invalid entry in TRUSTED_PROXIES, skipping");
                        None
                    }
                }
            })
            .collect();

        if !networks.is_empty() {
            debug!(count = networks.len(), "Trusted proxy validation enabled");
        }

        Self { networks }
    }

    pub fn is_enabled(&self) -> bool {
        !self.networks.is_empty()
    }

    /// Whether forwarding headers from `peer` should be believed.
    pub fn trusts(&self, peer: Option<IpAddr>) -> bool {
        if self.networks.is_empty() {
            return true;
        }
        peer.is_some_and(|ip| self.networks.iter().any(|net| net.contains(&ip)))
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves the client address of a request.
#[derive(Debug, Clone, Default)]
pub struct ClientIpResolver {
    trusted: Arc<TrustedProxies>,
}

impl ClientIpResolver {
    pub fn new(trusted: TrustedProxies) -> Self {
        Self {
            trusted: Arc::new(trusted),
        }
    }

    /// Resolve the client address. Never fails; the last resort is `""`.
    pub fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        let peer_ip = peer.map(|addr| addr.ip());

        let source = if self.trusted.trusts(peer_ip) {
            from_headers(headers)
        } else {
            if from_headers(headers).is_some() {
                debug!(
                    peer = ?peer_ip,
                    "Ignoring forwarding headers from untrusted peer"
                );
            }
            None
        };

        source
            .or_else(|| peer_ip.map(Source::Peer))
            .unwrap_or(Source::Unknown)
            .into_string()
    }
}

/// Resolve the client address with every peer trusted.
///
/// ```ignore
/// let ip = resolve_client_ip(req.headers(), Some(peer));
/// ```
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    ClientIpResolver::default().resolve(headers, peer)
}

pub(crate) fn peer_addr(extensions: &axum::http::Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

// =============================================================================
// Request Extension and Extractor
// =============================================================================

/// The resolved client address of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address attached by [`ClientIpLayer`], if any.
    pub fn attached<B>(req: &Request<B>) -> Option<&ClientIp> {
        req.extensions().get::<ClientIp>()
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ip) = parts.extensions.get::<ClientIp>() {
            return Ok(ip.clone());
        }
        Ok(ClientIp(resolve_client_ip(
            &parts.headers,
            peer_addr(&parts.extensions),
        )))
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Layer that attaches [`ClientIp`] to every request.
#[derive(Clone, Default)]
pub struct ClientIpLayer {
    resolver: ClientIpResolver,
}

impl ClientIpLayer {
    pub fn new(resolver: ClientIpResolver) -> Self {
        Self { resolver }
    }
}

impl<S> Layer<S> for ClientIpLayer {
    type Service = ClientIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClientIpService {
            inner,
            resolver: self.resolver.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ClientIpService<S> {
    inner: S,
    resolver: ClientIpResolver,
}

impl<S> Service<Request<Body>> for ClientIpService<S>
where
    S: Service<Request<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let ip = self
            .resolver
            .resolve(req.headers(), peer_addr(req.extensions()));
        req.extensions_mut().insert(ClientIp(ip));
        self.inner.call(req)
    }
}
