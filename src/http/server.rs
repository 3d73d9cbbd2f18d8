//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the relay entry point and collaborators
//! - Wire up middleware (tracing, timeout, request ID, auth gate)
//! - Bind the server to a listener and serve with graceful shutdown
//! - Dispatch each request via the classification rules

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ws::WebSocketUpgrade, FromRequestParts, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::observability::metrics;
use crate::relay::http::HttpClient;
use crate::routing::{classify, RequestClass};
use crate::{assets, auth, mirror, relay};

/// Application state injected into handlers. Cloning is cheap; the client
/// clones share one connection pool and the config is immutable.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub client: HttpClient,
}

/// HTTP server hosting the relay engine and its collaborators.
pub struct HttpServer {
    router: Router,
    config: Arc<RelayConfig>,
}

impl HttpServer {
    /// Create a new server from an immutable configuration.
    pub fn new(config: RelayConfig) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            client: relay::http::build_client(),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all routes and middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let prefix = config.relay.prefix.trim_end_matches('/').to_string();

        let mut router = Router::new()
            // All relay traffic lives under the reserved prefix.
            .route(&format!("{}/{{*target}}", prefix), any(relay_entry))
            // Bare prefix (no target yet): still relay traffic, decoding
            // rejects it as missing a target.
            .route(&format!("{}/", prefix), any(relay_entry))
            .merge(assets::router(config));

        if config.local {
            router = router.merge(mirror::router(config));
        }

        let mut router = router.with_state(state.clone());

        if config.challenge {
            router = router.layer(axum::middleware::from_fn_with_state(
                state.clone(),
                auth::gate,
            ));
        }

        router
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            // Relayed pages fetch cross-origin by construction, so the whole
            // surface answers permissively.
            .layer(CorsLayer::permissive())
            // Outer safety net only; the relay paths carry their own upstream
            // deadlines, so this sits above them.
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.relay.request_timeout_secs + 5,
            )))
    }

    /// Run the server until Ctrl-C or the shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.relay.prefix,
            challenge = self.config.challenge,
            "Relay server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                        }
                    }
                    _ = shutdown.recv() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Relay server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Entry point for everything under the reserved prefix.
///
/// Classification runs on the request head only; the body is consumed solely
/// by the path that owns it.
async fn relay_entry(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (mut parts, body) = request.into_parts();
    let method = parts.method.to_string();

    match classify(parts.uri.path(), &parts.headers, &state.config.relay.prefix) {
        RequestClass::WebSocketRelay => {
            let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
                Ok(upgrade) => upgrade,
                Err(rejection) => return rejection.into_response(),
            };
            match relay::websocket::handle(&state, upgrade, parts).await {
                Ok(response) => response,
                Err(error) => {
                    metrics::record_relay(&method, error.status().as_u16(), start);
                    error.into_response()
                }
            }
        }
        RequestClass::HttpRelay => match relay::http::relay(&state, parts, body).await {
            Ok(response) => {
                metrics::record_relay(&method, response.status().as_u16(), start);
                response.into_response()
            }
            Err(error) => {
                metrics::record_relay(&method, error.status().as_u16(), start);
                error.into_response()
            }
        },
        // Unreachable through the router, but the classification is total.
        RequestClass::PassThrough => StatusCode::NOT_FOUND.into_response(),
    }
}
