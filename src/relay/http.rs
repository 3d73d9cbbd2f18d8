//! HTTP relay path.
//!
//! # Data Flow
//! ```text
//! decode metadata → translate request → upstream fetch → translate response
//!     → stream body to client
//! ```
//!
//! # Design Decisions
//! - The legacy hyper client never follows redirects, so Location rewriting
//!   is the single place redirects are handled
//! - Bodies stream in both directions; nothing is buffered in full
//! - Dropping the handler future (client gone) aborts the upstream exchange

use axum::body::Body;
use axum::http::{request::Parts, Request, Response};
use hyper::body::Incoming;
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client, Error as ClientError};
use hyper_util::rt::TokioExecutor;
use tokio::time::timeout;

use crate::http::server::AppState;
use crate::relay::error::RelayError;
use crate::relay::response::RewriteContext;
use crate::relay::{metadata, request, Metadata};

/// Shared upstream client. Clones share one connection pool.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the upstream client used by the relay and mirror paths.
pub fn build_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpsConnector::new())
}

/// Carry one request/response exchange through the relay.
pub async fn relay(
    state: &AppState,
    parts: Parts,
    body: Body,
) -> Result<Response<Body>, RelayError> {
    let settings = &state.config.relay;

    let mut metadata = metadata::decode(
        parts.uri.path(),
        parts.uri.query(),
        &parts.headers,
        &settings.prefix,
    )?;
    normalize_to_http(&mut metadata)?;

    let outbound = request::translate(&parts.method, &parts.headers, &metadata)?;

    tracing::debug!(
        method = %outbound.method,
        target = %metadata.target,
        "relaying request"
    );

    let mut upstream_request = Request::builder()
        .method(outbound.method)
        .uri(outbound.uri)
        .body(body)
        .map_err(|e| RelayError::Internal(e.to_string()))?;
    *upstream_request.headers_mut() = outbound.headers;

    let upstream_response: Response<Incoming> = timeout(
        settings.request_timeout(),
        state.client.request(upstream_request),
    )
    .await
    .map_err(|_| RelayError::UpstreamTimeout)?
    .map_err(classify_client_error)?;

    let (mut head, incoming) = upstream_response.into_parts();
    head.headers = crate::relay::response::translate(
        head.status,
        &head.headers,
        &RewriteContext {
            prefix: &settings.prefix,
            target_scheme: metadata.target.scheme(),
            keep_headers: &settings.keep_response_headers,
        },
    );

    Ok(Response::from_parts(head, Body::new(incoming)))
}

/// One encoded form serves both relay paths: `ws`/`wss` targets landing here
/// are fetched as `http`/`https`.
fn normalize_to_http(metadata: &mut Metadata) -> Result<(), RelayError> {
    let mapped = match metadata.target.scheme() {
        "ws" => "http",
        "wss" => "https",
        _ => return Ok(()),
    };
    metadata
        .target
        .set_scheme(mapped)
        .map_err(|_| RelayError::Internal("could not normalize target scheme".into()))
}

fn classify_client_error(error: ClientError) -> RelayError {
    if error.is_connect() {
        RelayError::UpstreamUnreachable(error.to_string())
    } else {
        RelayError::UpstreamProtocol(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_ws_targets_normalize_to_http() {
        let mut m = Metadata::for_target(Url::parse("ws://example.com/socket").unwrap());
        normalize_to_http(&mut m).unwrap();
        assert_eq!(m.target.as_str(), "http://example.com/socket");

        let mut m = Metadata::for_target(Url::parse("wss://example.com/socket").unwrap());
        normalize_to_http(&mut m).unwrap();
        assert_eq!(m.target.scheme(), "https");
    }

    #[test]
    fn test_http_targets_untouched() {
        let mut m = Metadata::for_target(Url::parse("https://example.com/x").unwrap());
        normalize_to_http(&mut m).unwrap();
        assert_eq!(m.target.as_str(), "https://example.com/x");
    }
}
