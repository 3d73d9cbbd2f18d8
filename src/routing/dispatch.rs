//! The dispatcher: terminal classification of each inbound request.

use axum::http::{header, HeaderMap};

/// Terminal classification for one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Standard request/response exchange through the relay.
    HttpRelay,
    /// Protocol-upgrade request to be tunneled frame-by-frame.
    WebSocketRelay,
    /// Not relay traffic; handed to the static/mirror collaborators.
    PassThrough,
}

/// Classify a request from its head alone.
///
/// WebSocketRelay requires both the reserved prefix and an `Upgrade` header
/// carrying the `websocket` token; the prefix alone selects HttpRelay.
pub fn classify(path: &str, headers: &HeaderMap, prefix: &str) -> RequestClass {
    if !path.starts_with(prefix) {
        return RequestClass::PassThrough;
    }
    if wants_websocket(headers) {
        RequestClass::WebSocketRelay
    } else {
        RequestClass::HttpRelay
    }
}

/// True when the `Upgrade` header requests `websocket`, comma-list aware and
/// case-insensitive per token.
fn wants_websocket(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("websocket"))
        })
        .unwrap_or(false)
}
