//! Client-facing response translation.
//!
//! # Responsibilities
//! - Scope `Set-Cookie` to the relay's own origin (drop `Domain`, pin `Path`)
//! - Re-encode absolute `Location` targets on redirects through the codec
//! - Strip security-policy headers that assume the upstream's real origin
//! - Pass status and body through untouched
//!
//! # Design Decisions
//! - Relative redirects are left alone: they already resolve under the prefix
//! - The strip list is overridable per header via `relay.keep_response_headers`

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use url::Url;

use super::metadata::encode_target;
use super::request::HOP_BY_HOP;

/// Response headers that would assert a policy bound to the upstream's real
/// origin. Stripped unless explicitly kept by configuration.
pub const SECURITY_HEADERS: [&str; 7] = [
    "content-security-policy",
    "content-security-policy-report-only",
    "x-frame-options",
    "cross-origin-opener-policy",
    "cross-origin-embedder-policy",
    "cross-origin-resource-policy",
    "strict-transport-security",
];

/// Rewriting parameters, borrowed from the process configuration.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// Reserved relay prefix, e.g. `/relay/`.
    pub prefix: &'a str,
    /// Scheme of the upstream target, for resolving scheme-relative redirects.
    pub target_scheme: &'a str,
    /// Security headers exempted from stripping (case-insensitive names).
    pub keep_headers: &'a [String],
}

/// Build the client-facing header map from an upstream response head.
pub fn translate(status: StatusCode, upstream: &HeaderMap, ctx: &RewriteContext<'_>) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(upstream.len());

    for (name, value) in upstream.iter() {
        let lower = name.as_str();
        if HOP_BY_HOP.contains(&lower) {
            continue;
        }
        if SECURITY_HEADERS.contains(&lower) && !is_kept(lower, ctx.keep_headers) {
            continue;
        }
        if name == header::SET_COOKIE {
            if let Some(rewritten) = rewrite_set_cookie(value, ctx.prefix) {
                out.append(header::SET_COOKIE, rewritten);
                continue;
            }
        }
        if name == header::LOCATION && status.is_redirection() {
            out.append(header::LOCATION, rewrite_location(value, ctx));
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    out
}

/// Scope one `Set-Cookie` value to the relay origin: the `Domain` attribute
/// is dropped and `Path` is pinned to the relay prefix. Values that are not
/// valid UTF-8 pass through unchanged.
fn rewrite_set_cookie(value: &HeaderValue, prefix: &str) -> Option<HeaderValue> {
    let raw = value.to_str().ok()?;
    let mut parts: Vec<String> = Vec::new();

    for (i, attr) in raw.split(';').enumerate() {
        let trimmed = attr.trim();
        if i == 0 {
            parts.push(trimmed.to_string());
            continue;
        }
        let attr_name = trimmed.split('=').next().unwrap_or("").trim();
        if attr_name.eq_ignore_ascii_case("domain") || attr_name.eq_ignore_ascii_case("path") {
            continue;
        }
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }
    parts.push(format!("Path={prefix}"));

    HeaderValue::from_str(&parts.join("; ")).ok()
}

/// Re-encode an absolute redirect target so the browser's follow-up request
/// routes through the relay again. Relative targets are left untouched; they
/// already resolve under the prefix. Network-path references (`//host/path`)
/// count as absolute: the browser would resolve them against the relay
/// origin's scheme and leave the relay, so they take the upstream target's
/// scheme instead.
fn rewrite_location(value: &HeaderValue, ctx: &RewriteContext<'_>) -> HeaderValue {
    let Ok(raw) = value.to_str() else {
        return value.clone();
    };
    let absolute = if raw.starts_with("//") {
        format!("{}:{raw}", ctx.target_scheme)
    } else {
        raw.to_string()
    };
    match Url::parse(&absolute) {
        Ok(target) if matches!(target.scheme(), "http" | "https" | "ws" | "wss") => {
            HeaderValue::from_str(&encode_target(&target, ctx.prefix))
                .unwrap_or_else(|_| value.clone())
        }
        _ => value.clone(),
    }
}

fn is_kept(name: &str, keep: &[String]) -> bool {
    keep.iter().any(|k| k.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::metadata;

    const PREFIX: &str = "/relay/";

    fn ctx<'a>(keep: &'a [String]) -> RewriteContext<'a> {
        RewriteContext {
            prefix: PREFIX,
            target_scheme: "https",
            keep_headers: keep,
        }
    }

    #[test]
    fn test_set_cookie_scoped_to_relay_origin() {
        let mut upstream = HeaderMap::new();
        upstream.insert(
            header::SET_COOKIE,
            "a=1; Domain=example.com; Path=/app; HttpOnly".parse().unwrap(),
        );

        let out = translate(StatusCode::OK, &upstream, &ctx(&[]));
        let cookie = out.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert_eq!(cookie, "a=1; HttpOnly; Path=/relay/");
        assert!(!cookie.contains("example.com"));
    }

    #[test]
    fn test_multiple_set_cookie_values_all_rewritten() {
        let mut upstream = HeaderMap::new();
        upstream.append(header::SET_COOKIE, "a=1; Domain=x.com".parse().unwrap());
        upstream.append(header::SET_COOKIE, "b=2; Secure".parse().unwrap());

        let out = translate(StatusCode::OK, &upstream, &ctx(&[]));
        let cookies: Vec<_> = out
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["a=1; Path=/relay/", "b=2; Secure; Path=/relay/"]);
    }

    #[test]
    fn test_absolute_location_reenters_relay() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::LOCATION, "https://example.com/x".parse().unwrap());

        let out = translate(StatusCode::FOUND, &upstream, &ctx(&[]));
        let location = out.get(header::LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with(PREFIX));

        // Following the rewritten Location must resolve to the original target.
        let decoded = metadata::decode(location, None, &HeaderMap::new(), PREFIX).unwrap();
        assert_eq!(decoded.target.as_str(), "https://example.com/x");
    }

    #[test]
    fn test_protocol_relative_location_reenters_relay() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::LOCATION, "//evil.example.com/x".parse().unwrap());

        let out = translate(StatusCode::FOUND, &upstream, &ctx(&[]));
        let location = out.get(header::LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with(PREFIX), "escaped the relay: {location}");

        let decoded = metadata::decode(location, None, &HeaderMap::new(), PREFIX).unwrap();
        assert_eq!(decoded.target.as_str(), "https://evil.example.com/x");
    }

    #[test]
    fn test_relative_location_untouched() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::LOCATION, "/login".parse().unwrap());

        let out = translate(StatusCode::SEE_OTHER, &upstream, &ctx(&[]));
        assert_eq!(out.get(header::LOCATION).unwrap(), "/login");
    }

    #[test]
    fn test_location_left_alone_outside_redirects() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::LOCATION, "https://example.com/x".parse().unwrap());

        let out = translate(StatusCode::CREATED, &upstream, &ctx(&[]));
        assert_eq!(out.get(header::LOCATION).unwrap(), "https://example.com/x");
    }

    #[test]
    fn test_security_headers_stripped_by_default() {
        let mut upstream = HeaderMap::new();
        upstream.insert("content-security-policy", "default-src 'none'".parse().unwrap());
        upstream.insert("x-frame-options", "DENY".parse().unwrap());
        upstream.insert(header::CONTENT_TYPE, "text/html".parse().unwrap());

        let out = translate(StatusCode::OK, &upstream, &ctx(&[]));
        assert!(out.get("content-security-policy").is_none());
        assert!(out.get("x-frame-options").is_none());
        assert_eq!(out.get(header::CONTENT_TYPE).unwrap(), "text/html");
    }

    #[test]
    fn test_keep_list_exempts_headers_from_stripping() {
        let keep = vec!["X-Frame-Options".to_string()];
        let mut upstream = HeaderMap::new();
        upstream.insert("x-frame-options", "DENY".parse().unwrap());
        upstream.insert("content-security-policy", "default-src 'none'".parse().unwrap());

        let out = translate(StatusCode::OK, &upstream, &ctx(&keep));
        assert_eq!(out.get("x-frame-options").unwrap(), "DENY");
        assert!(out.get("content-security-policy").is_none());
    }

    #[test]
    fn test_hop_by_hop_response_headers_dropped() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONNECTION, "close".parse().unwrap());
        upstream.insert(header::CONTENT_LENGTH, "5".parse().unwrap());

        let out = translate(StatusCode::OK, &upstream, &ctx(&[]));
        assert!(out.get(header::CONNECTION).is_none());
        assert_eq!(out.get(header::CONTENT_LENGTH).unwrap(), "5");
    }
}
