//! Outbound request translation.
//!
//! # Responsibilities
//! - Copy method verbatim; the body streams through untouched elsewhere
//! - Rewrite `Host` to the target authority
//! - Drop hop-by-hop, relay-auth and `x-relay-*` metadata headers
//! - Build a single `Cookie` header from the forwarded cookie list
//!
//! # Design Decisions
//! - Pure transformation, no I/O; the relay paths own the network
//! - Idempotent for a fixed metadata envelope (re-translation is a no-op)

use axum::http::{header, HeaderMap, HeaderValue, Method, Uri};
use url::Url;

use super::error::RelayError;
use super::metadata::{Metadata, MetadataError, X_RELAY_COOKIES, X_RELAY_HEADERS};

/// Headers meaningful only for a single transport hop, never forwarded.
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Description of the request to issue upstream. The body is carried
/// separately so this stays a plain, comparable value.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Build the outbound request description from an inbound request head and
/// its decoded metadata.
pub fn translate(
    method: &Method,
    inbound: &HeaderMap,
    metadata: &Metadata,
) -> Result<OutboundRequest, RelayError> {
    let uri: Uri = metadata
        .target
        .as_str()
        .parse()
        .map_err(|_| RelayError::Internal("decoded target is not a valid URI".into()))?;

    let mut headers = inbound.clone();
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    // Never leak the relay's own identity or instructions upstream.
    headers.remove(header::HOST);
    headers.remove(header::AUTHORIZATION);
    headers.remove(&X_RELAY_HEADERS);
    headers.remove(&X_RELAY_COOKIES);
    // Cookies are rebuilt below from the forwarded list only.
    headers.remove(header::COOKIE);

    headers.insert(
        header::HOST,
        HeaderValue::from_str(&host_header(&metadata.target))
            .map_err(|_| RelayError::Metadata(MetadataError::Unencodable))?,
    );

    // The first occurrence of a name replaces any inbound value; repeats
    // append, so duplicate forwarded headers survive in order.
    let mut applied: Vec<header::HeaderName> = Vec::new();
    for (name, value) in &metadata.forward_headers {
        let name: header::HeaderName = name
            .parse()
            .map_err(|_| RelayError::Metadata(MetadataError::Unencodable))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| RelayError::Metadata(MetadataError::Unencodable))?;
        if applied.contains(&name) {
            headers.append(name, value);
        } else {
            headers.insert(name.clone(), value);
            applied.push(name);
        }
    }

    if let Some(cookie) = cookie_header(&metadata.forward_cookies) {
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&cookie)
                .map_err(|_| RelayError::Metadata(MetadataError::Unencodable))?,
        );
    }

    Ok(OutboundRequest {
        method: method.clone(),
        uri,
        headers,
    })
}

/// `Host` header value for a target: port included only when non-default.
pub fn host_header(target: &Url) -> String {
    let host = target.host_str().unwrap_or_default();
    match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Merge forwarded cookies into one `Cookie` header value, de-duplicated by
/// name with the last write winning. Returns `None` when nothing is forwarded.
pub fn cookie_header(cookies: &[(String, String)]) -> Option<String> {
    let mut merged: Vec<(&str, &str)> = Vec::new();
    for (name, value) in cookies {
        match merged.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => merged.push((name, value)),
        }
    }
    if merged.is_empty() {
        return None;
    }
    Some(
        merged
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
