//! Client address resolution.

use axum::http::HeaderMap;
use std::net::SocketAddr;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the client address for a request.
///
/// The first hop of `X-Forwarded-For` wins over the socket peer. Only the
/// first header line is consulted when the header is repeated.
pub fn resolve_remote_address(headers: &HeaderMap, socket: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok());

    match forwarded {
        Some(list) => list.split(',').next().map(|hop| hop.trim().to_string()),
        None => socket.map(|addr| addr.ip().to_string()),
    }
}
