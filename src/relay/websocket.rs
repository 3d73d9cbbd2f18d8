//! WebSocket relay path.
//!
//! # Data Flow
//! ```text
//! upgrade request → decode metadata → upstream handshake (subprotocols
//! forwarded) → complete client handshake → two concurrent frame pumps
//! ```
//!
//! # Close semantics
//! Either direction finishing (close frame, socket error, idle timeout)
//! propagates a close to the other side; the laggard gets a bounded grace
//! window to flush before its task is aborted and both sockets drop. No
//! half-open socket survives the session.

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::http::{header, request::Parts};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, protocol};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::{metadata, request, Metadata};

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle an upgrade request under the relay prefix: open the matching
/// upstream connection first, then complete the client handshake and pump.
pub async fn handle(
    state: &AppState,
    ws: WebSocketUpgrade,
    parts: Parts,
) -> Result<Response, RelayError> {
    let settings = &state.config.relay;

    let mut metadata = metadata::decode(
        parts.uri.path(),
        parts.uri.query(),
        &parts.headers,
        &settings.prefix,
    )?;
    normalize_to_ws(&mut metadata)?;

    let mut upstream_request = metadata
        .target
        .as_str()
        .into_client_request()
        .map_err(|e| RelayError::Internal(e.to_string()))?;

    // Forward the client's subprotocol offer so the target negotiates
    // against the real list.
    if let Some(protocols) = parts.headers.get(header::SEC_WEBSOCKET_PROTOCOL) {
        upstream_request
            .headers_mut()
            .insert(header::SEC_WEBSOCKET_PROTOCOL, protocols.clone());
    }
    let mut applied: Vec<header::HeaderName> = Vec::new();
    for (name, value) in &metadata.forward_headers {
        let name: header::HeaderName = name
            .parse()
            .map_err(|_| RelayError::Metadata(metadata::MetadataError::Unencodable))?;
        let value = header::HeaderValue::from_str(value)
            .map_err(|_| RelayError::Metadata(metadata::MetadataError::Unencodable))?;
        if applied.contains(&name) {
            upstream_request.headers_mut().append(name, value);
        } else {
            upstream_request.headers_mut().insert(name.clone(), value);
            applied.push(name);
        }
    }
    if let Some(cookie) = request::cookie_header(&metadata.forward_cookies) {
        upstream_request.headers_mut().insert(
            header::COOKIE,
            header::HeaderValue::from_str(&cookie)
                .map_err(|_| RelayError::Metadata(metadata::MetadataError::Unencodable))?,
        );
    }

    let (upstream, handshake_response) = timeout(
        settings.connect_timeout(),
        connect_async(upstream_request),
    )
    .await
    .map_err(|_| RelayError::UpstreamTimeout)?
    .map_err(classify_handshake_error)?;

    let negotiated = handshake_response
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let target = metadata.target.clone();
    let idle = settings.idle_timeout();
    let grace = settings.close_grace();

    let upgrade = match negotiated {
        Some(protocol) => ws.protocols([protocol]),
        None => ws,
    };
    Ok(upgrade.on_upgrade(move |client| session(client, upstream, target, idle, grace)))
}

/// One live tunnel: both sockets open, one pump task per direction.
async fn session(
    client: WebSocket,
    upstream: UpstreamSocket,
    target: Url,
    idle: Duration,
    grace: Duration,
) {
    let session_id = Uuid::new_v4();
    tracing::info!(%session_id, %target, "tunnel session opened");
    metrics::session_opened();

    let (client_sink, client_stream) = client.split();
    let (upstream_sink, upstream_stream) = upstream.split();

    let mut client_to_upstream =
        tokio::spawn(pump_client_to_upstream(client_stream, upstream_sink, idle));
    let mut upstream_to_client =
        tokio::spawn(pump_upstream_to_client(upstream_stream, client_sink, idle));

    let (reason, laggard) = tokio::select! {
        r = &mut client_to_upstream => (finish_reason(r), &mut upstream_to_client),
        r = &mut upstream_to_client => (finish_reason(r), &mut client_to_upstream),
    };

    // Bounded grace window for the other direction to flush its close frame,
    // then tear it down; dropping the halves closes both sockets.
    if timeout(grace, &mut *laggard).await.is_err() {
        laggard.abort();
    }

    metrics::session_closed();
    tracing::info!(%session_id, reason, "tunnel session closed");
}

async fn pump_client_to_upstream(
    mut client: SplitStream<WebSocket>,
    mut upstream: SplitSink<UpstreamSocket, tungstenite::Message>,
    idle: Duration,
) -> &'static str {
    loop {
        match timeout(idle, client.next()).await {
            Err(_) => {
                let _ = upstream.send(tungstenite::Message::Close(None)).await;
                return "client idle timeout";
            }
            Ok(None) => {
                let _ = upstream.send(tungstenite::Message::Close(None)).await;
                return "client disconnected";
            }
            Ok(Some(Err(_))) => {
                let _ = upstream.send(tungstenite::Message::Close(None)).await;
                return "client socket error";
            }
            Ok(Some(Ok(message))) => {
                let closing = matches!(message, Message::Close(_));
                if let Some(outbound) = to_upstream_message(message) {
                    if upstream.send(outbound).await.is_err() {
                        return "upstream send failed";
                    }
                }
                if closing {
                    return "client sent close";
                }
            }
        }
    }
}

async fn pump_upstream_to_client(
    mut upstream: SplitStream<UpstreamSocket>,
    mut client: SplitSink<WebSocket, Message>,
    idle: Duration,
) -> &'static str {
    loop {
        match timeout(idle, upstream.next()).await {
            Err(_) => {
                let _ = client.send(Message::Close(None)).await;
                return "upstream idle timeout";
            }
            Ok(None) => {
                let _ = client.send(Message::Close(None)).await;
                return "upstream disconnected";
            }
            Ok(Some(Err(_))) => {
                let _ = client.send(Message::Close(None)).await;
                return "upstream socket error";
            }
            Ok(Some(Ok(message))) => {
                let closing = matches!(message, tungstenite::Message::Close(_));
                if let Some(outbound) = to_client_message(message) {
                    if client.send(outbound).await.is_err() {
                        return "client send failed";
                    }
                }
                if closing {
                    return "upstream sent close";
                }
            }
        }
    }
}

fn to_upstream_message(message: Message) -> Option<tungstenite::Message> {
    match message {
        Message::Text(text) => Some(tungstenite::Message::Text(text.as_str().into())),
        Message::Binary(data) => Some(tungstenite::Message::Binary(data)),
        Message::Ping(data) => Some(tungstenite::Message::Ping(data)),
        Message::Pong(data) => Some(tungstenite::Message::Pong(data)),
        Message::Close(frame) => Some(tungstenite::Message::Close(frame.map(|f| {
            protocol::CloseFrame {
                code: f.code.into(),
                reason: f.reason.as_str().into(),
            }
        }))),
    }
}

fn to_client_message(message: tungstenite::Message) -> Option<Message> {
    match message {
        tungstenite::Message::Text(text) => Some(Message::Text(Utf8Bytes::from(text.as_str()))),
        tungstenite::Message::Binary(data) => Some(Message::Binary(data)),
        tungstenite::Message::Ping(data) => Some(Message::Ping(data)),
        tungstenite::Message::Pong(data) => Some(Message::Pong(data)),
        tungstenite::Message::Close(frame) => Some(Message::Close(frame.map(|f| CloseFrame {
            code: f.code.into(),
            reason: Utf8Bytes::from(f.reason.as_str()),
        }))),
        // Raw frames only appear with manual frame writing, which the relay
        // never does.
        tungstenite::Message::Frame(_) => None,
    }
}

fn finish_reason(result: Result<&'static str, tokio::task::JoinError>) -> &'static str {
    result.unwrap_or("pump task failed")
}

/// Mirror of the HTTP path's normalization: `http`/`https` targets landing
/// on an upgrade request are dialed as `ws`/`wss`.
fn normalize_to_ws(metadata: &mut Metadata) -> Result<(), RelayError> {
    let mapped = match metadata.target.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Ok(()),
    };
    metadata
        .target
        .set_scheme(mapped)
        .map_err(|_| RelayError::Internal("could not normalize target scheme".into()))
}

fn classify_handshake_error(error: tungstenite::Error) -> RelayError {
    match error {
        tungstenite::Error::Io(io) => RelayError::UpstreamUnreachable(io.to_string()),
        tungstenite::Error::Http(response) => RelayError::UpstreamProtocol(format!(
            "upgrade rejected with status {}",
            response.status()
        )),
        other => RelayError::UpstreamProtocol(other.to_string()),
    }
}
