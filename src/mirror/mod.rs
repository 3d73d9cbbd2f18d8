//! Fixed-mirror fetch helpers.
//!
//! For a small set of configured path prefixes, fetches from one hardcoded
//! upstream base URL and streams the result back verbatim. No metadata
//! decoding; independent of the relay engine. Upstream failure falls through
//! to a 404 rather than surfacing an error, matching the deployment this
//! replaces.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::time::timeout;

use crate::config::RelayConfig;
use crate::http::server::AppState;

/// Build one GET route per configured mirror.
pub fn router(config: &RelayConfig) -> Router<AppState> {
    let mut router = Router::new();

    for mirror in &config.mirrors {
        let upstream = mirror.upstream.clone();
        router = router.route(
            &format!("{}{{*path}}", mirror.prefix),
            get(
                move |State(state): State<AppState>, Path(rest): Path<String>| {
                    let upstream = upstream.clone();
                    async move { fetch(state, upstream, rest).await }
                },
            ),
        );
    }

    router
}

/// Fetch `upstream/rest` and stream it back, or fall through to 404.
async fn fetch(state: AppState, upstream: String, rest: String) -> Response {
    let target = format!("{}/{}", upstream.trim_end_matches('/'), rest);
    let Ok(uri) = target.parse::<Uri>() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("GET request with empty body is always valid");

    let deadline = state.config.relay.request_timeout();
    match timeout(deadline, state.client.request(request)).await {
        Ok(Ok(response)) if response.status().is_success() => {
            let (head, body) = response.into_parts();
            let mut out = Response::builder().status(StatusCode::OK);
            if let Some(content_type) = head.headers.get(header::CONTENT_TYPE) {
                out = out.header(header::CONTENT_TYPE, content_type);
            }
            out.body(Body::new(body))
                .unwrap_or_else(|_| StatusCode::NOT_FOUND.into_response())
        }
        Ok(Ok(response)) => {
            tracing::debug!(%target, status = %response.status(), "mirror upstream miss");
            StatusCode::NOT_FOUND.into_response()
        }
        Ok(Err(error)) => {
            tracing::warn!(%target, error = %error, "mirror fetch failed");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(_) => {
            tracing::warn!(%target, "mirror fetch timed out");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
