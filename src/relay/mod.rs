//! Relay protocol engine.
//!
//! # Data Flow
//! ```text
//! Inbound request under the reserved prefix
//!     → metadata.rs (decode target + forwarding instructions)
//!     → request.rs (build outbound request description)
//!     → http.rs (upstream fetch, redirects NOT followed)
//!         or websocket.rs (upstream upgrade + frame pump)
//!     → response.rs (rewrite headers for the client)
//!     → Stream body / frames back to client
//! ```
//!
//! # Design Decisions
//! - Translators are pure functions; all I/O lives in http.rs / websocket.rs
//! - The upstream client never follows redirects; Location rewriting owns them
//! - Per-request errors map to status codes and never touch other requests

pub mod error;
pub mod http;
pub mod metadata;
pub mod request;
pub mod response;
pub mod websocket;

pub use error::RelayError;
pub use metadata::Metadata;
