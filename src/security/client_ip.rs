//! Client address resolution.
//!
//! The socket peer is the client unless the service sits behind trusted
//! proxies. With `trust_hops = n`, the n-th `X-Forwarded-For` entry counted
//! from the right is the client; if the chain is shorter, its leftmost entry.
//! Parsing stops at the first entry that is not an IP address.

use std::net::{IpAddr, SocketAddr};

use axum::{extract::ConnectInfo, extract::Request, http::HeaderName};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Resolve the caller's IP address for `request`.
pub fn resolve<B>(request: &Request<B>, trust_hops: usize) -> Option<IpAddr> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if trust_hops == 0 {
        return peer;
    }

    request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|chain| from_forwarded(chain, trust_hops))
        .or(peer)
}

/// Pick the client out of an `X-Forwarded-For` chain.
pub fn from_forwarded(chain: &str, trust_hops: usize) -> Option<IpAddr> {
    let hops: Vec<IpAddr> = chain
        .rsplit(',')
        .map(str::trim)
        .map_while(|entry| entry.parse().ok())
        .take(trust_hops)
        .collect();
    hops.last().copied()
}
