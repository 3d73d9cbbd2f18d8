//! Out-of-band relay instructions and their wire encoding.
//!
//! # Responsibilities
//! - Decode the target URL from the path segment after the reserved prefix
//! - Decode forwarded headers / cookies from the `x-relay-*` request headers
//! - Re-encode a [`Metadata`] envelope for the outbound hop (round-trip safe)
//!
//! # Wire format
//! ```text
//! GET /relay/https%3A%2F%2Fexample.com%2Fdata HTTP/1.1
//! x-relay-headers: [["accept-language","en"]]
//! x-relay-cookies: [["session","abc123"]]
//! ```
//! The target is one percent-encoded path segment; forward lists are JSON
//! arrays of `[name, value]` pairs so duplicates and ordering survive.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::Url;

/// Request header carrying headers the client wants forwarded upstream.
pub static X_RELAY_HEADERS: HeaderName = HeaderName::from_static("x-relay-headers");

/// Request header carrying cookies the client wants forwarded upstream.
pub static X_RELAY_COOKIES: HeaderName = HeaderName::from_static("x-relay-cookies");

/// Percent-encoding set for the target path segment: everything except the
/// RFC 3986 unreserved characters, so `/`, `?` and `#` never split the segment.
const TARGET_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Decoded relay instructions for one request. Derived fresh per request,
/// never mutated after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Absolute target URL (`http`, `https`, `ws` or `wss`).
    pub target: Url,
    /// Headers the client asked to forward, in order.
    pub forward_headers: Vec<(String, String)>,
    /// Cookies the client asked to forward, in order.
    pub forward_cookies: Vec<(String, String)>,
}

impl Metadata {
    /// Envelope carrying only a target, as produced for rewritten redirects.
    pub fn for_target(target: Url) -> Self {
        Self {
            target,
            forward_headers: Vec::new(),
            forward_cookies: Vec::new(),
        }
    }
}

/// The encoded form of a [`Metadata`] envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    /// Request path, reserved prefix included.
    pub path: String,
    /// `x-relay-*` headers to attach to the request.
    pub headers: HeaderMap,
}

/// Decoding/encoding failures. All of them are client errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("missing relay target after prefix")]
    MissingTarget,
    #[error("target segment is not valid percent-encoded UTF-8")]
    InvalidEncoding,
    #[error("target is not an absolute URL: {0}")]
    InvalidTarget(#[from] url::ParseError),
    #[error("unsupported target scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("malformed forward list: {0}")]
    InvalidForwardList(#[from] serde_json::Error),
    #[error("forwarding instructions are not header-safe")]
    Unencodable,
}

/// Decode the relay instructions from a request head.
///
/// `query` is the raw query string of the inbound request, if any; browsers
/// append one when a relayed page submits a form, so it is merged into the
/// decoded target.
pub fn decode(
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    prefix: &str,
) -> Result<Metadata, MetadataError> {
    let segment = path
        .strip_prefix(prefix)
        .filter(|rest| !rest.is_empty())
        .ok_or(MetadataError::MissingTarget)?;

    let raw = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|_| MetadataError::InvalidEncoding)?;

    let mut target = Url::parse(&raw)?;
    match target.scheme() {
        "http" | "https" | "ws" | "wss" => {}
        other => return Err(MetadataError::UnsupportedScheme(other.to_string())),
    }

    if let Some(q) = query.filter(|q| !q.is_empty()) {
        let merged = match target.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{q}"),
            _ => q.to_string(),
        };
        target.set_query(Some(&merged));
    }

    Ok(Metadata {
        target,
        forward_headers: pair_list(headers.get(&X_RELAY_HEADERS))?,
        forward_cookies: pair_list(headers.get(&X_RELAY_COOKIES))?,
    })
}

/// Encode a [`Metadata`] envelope back to its wire form.
pub fn encode(metadata: &Metadata, prefix: &str) -> Result<Encoded, MetadataError> {
    let mut headers = HeaderMap::new();
    if !metadata.forward_headers.is_empty() {
        headers.insert(
            X_RELAY_HEADERS.clone(),
            json_header(&metadata.forward_headers)?,
        );
    }
    if !metadata.forward_cookies.is_empty() {
        headers.insert(
            X_RELAY_COOKIES.clone(),
            json_header(&metadata.forward_cookies)?,
        );
    }

    Ok(Encoded {
        path: encode_target(&metadata.target, prefix),
        headers,
    })
}

/// Encode just a target URL as a relay path. Used for `Location` rewriting,
/// where no forwarding instructions travel along.
pub fn encode_target(target: &Url, prefix: &str) -> String {
    format!("{prefix}{}", utf8_percent_encode(target.as_str(), TARGET_SEGMENT))
}

fn pair_list(value: Option<&HeaderValue>) -> Result<Vec<(String, String)>, MetadataError> {
    match value {
        None => Ok(Vec::new()),
        Some(v) => {
            let text = v.to_str().map_err(|_| MetadataError::InvalidEncoding)?;
            Ok(serde_json::from_str(text)?)
        }
    }
}

fn json_header(pairs: &[(String, String)]) -> Result<HeaderValue, MetadataError> {
    let text = serde_json::to_string(pairs).map_err(MetadataError::InvalidForwardList)?;
    HeaderValue::from_str(&text).map_err(|_| MetadataError::Unencodable)
}
