//! Fuzz the client IP resolver with arbitrary forwarding headers.
//!
//! Resolution must never panic, and whatever it returns must come from the
//! headers or the peer address.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_client_ip -- -max_total_time=60
//! ```

#![no_main]

use std::net::{IpAddr, SocketAddr};

use arbitrary::Arbitrary;
use axum::http::{HeaderMap, HeaderValue};
use libfuzzer_sys::fuzz_target;
use travel_gate::middleware::{
    ClientIpResolver, TrustedProxies, X_FORWARDED_FOR, X_REAL_IP, resolve_client_ip,
};

#[derive(Debug, Arbitrary)]
struct Input {
    forwarded_for: Option<Vec<u8>>,
    real_ip: Option<Vec<u8>>,
    peer: Option<(IpAddr, u16)>,
    trusted: Vec<String>,
}

fuzz_target!(|input: Input| {
    let mut headers = HeaderMap::new();
    if let Some(value) = input.forwarded_for.as_deref()
        && let Ok(value) = HeaderValue::from_bytes(value)
    {
        headers.insert(X_FORWARDED_FOR, value);
    }
    if let Some(value) = input.real_ip.as_deref()
        && let Ok(value) = HeaderValue::from_bytes(value)
    {
        headers.insert(X_REAL_IP, value);
    }
    let peer = input.peer.map(SocketAddr::from);

    let ip = resolve_client_ip(&headers, peer);
    assert_eq!(ip, ip.trim());
    if let Some(peer) = peer
        && headers.is_empty()
    {
        assert_eq!(ip, peer.ip().to_string());
    }

    let resolver = ClientIpResolver::new(TrustedProxies::new(&input.trusted));
    let _ = resolver.resolve(&headers, peer);
});
