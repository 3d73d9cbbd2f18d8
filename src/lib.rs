//! Web-traffic relay library.
//!
//! A transport-level relay: browsers fetch arbitrary third-party HTTP and
//! WebSocket resources through this process, with the true destination
//! encoded out-of-band. The relay rebuilds each outbound request from the
//! relay's own network context and streams the response (or pumps WebSocket
//! frames) back, preserving the semantics the browser expects.

// Relay engine
pub mod relay;
pub mod routing;

// HTTP surface and collaborators
pub mod assets;
pub mod auth;
pub mod http;
pub mod mirror;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
