//! Inbound request classification.
//!
//! # Data Flow
//! ```text
//! Incoming request head (path, upgrade header)
//!     → dispatch.rs (classify)
//!     → HttpRelay | WebSocketRelay | PassThrough
//! ```
//!
//! # Design Decisions
//! - Classification reads the request head only, before any body handling
//! - PassThrough hands the request to the static/mirror collaborators
//! - Deterministic: same head always classifies the same way

pub mod dispatch;

pub use dispatch::{classify, RequestClass};
