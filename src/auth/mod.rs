//! Credential gate for the whole inbound surface.
//!
//! # Responsibilities
//! - Enforce HTTP Basic credentials before any request reaches the dispatcher
//! - Issue a browser challenge (401 + `WWW-Authenticate`) on missing or bad
//!   credentials
//!
//! # Design Decisions
//! - Applied as a router-wide middleware layer only when `challenge` is set
//! - The accepted `Authorization` header never travels upstream; the request
//!   translator strips it

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::HashMap;

use crate::http::server::AppState;

/// Router-wide middleware enforcing the credential map.
pub async fn gate(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if authorized(request.headers(), &state.config.users) {
        next.run(request).await
    } else {
        challenge()
    }
}

fn authorized(headers: &HeaderMap, users: &HashMap<String, String>) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((user, password)) = credentials.split_once(':') else {
        return false;
    };
    users.get(user).map(String::as_str) == Some(password)
}

fn challenge() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"web-relay\"")],
        "Unauthorized",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn users() -> HashMap<String, String> {
        HashMap::from([("admin".to_string(), "hunter2".to_string())])
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn test_valid_credentials_accepted() {
        let encoded = STANDARD.encode("admin:hunter2");
        assert!(authorized(&headers_with(&format!("Basic {encoded}")), &users()));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let encoded = STANDARD.encode("admin:wrong");
        assert!(!authorized(&headers_with(&format!("Basic {encoded}")), &users()));
    }

    #[test]
    fn test_missing_or_malformed_header_rejected() {
        assert!(!authorized(&HeaderMap::new(), &users()));
        assert!(!authorized(&headers_with("Bearer token"), &users()));
        assert!(!authorized(&headers_with("Basic !!!notbase64!!!"), &users()));
    }

    #[test]
    fn test_challenge_carries_www_authenticate() {
        let response = challenge();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
