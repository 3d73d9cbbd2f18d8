//! HTTP surface of the relay.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, auth gate, middleware)
//!     → routing::classify (relay vs pass-through)
//!     → relay engine, or static/mirror collaborators
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
