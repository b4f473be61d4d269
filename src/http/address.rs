//! Client address resolution behind proxies.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Resolve the originating client address.
///
/// The first forwarding header with a usable value wins. Comma separated
/// chains (`X-Forwarded-For: client, proxy1`) yield their first element.
/// Without a usable header the transport peer IP is used.
pub fn client_address(headers: &HeaderMap, peer: SocketAddr, forward_headers: &[String]) -> String {
    forward_headers
        .iter()
        .filter_map(|name| headers.get(name.as_str()))
        .filter_map(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or_default().trim())
        .find(|value| !value.is_empty() && !value.eq_ignore_ascii_case("unknown"))
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}
