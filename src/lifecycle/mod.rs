//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: load config → validate → build server → bind listener → serve
//! Shutdown: Ctrl-C or Shutdown::trigger → stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown is broadcast so every long-running task can observe it

pub mod shutdown;

pub use shutdown::Shutdown;
