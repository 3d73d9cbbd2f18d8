//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relayed exchanges by method, status
//! - `relay_request_duration_seconds` (histogram): latency distribution
//! - `relay_ws_sessions_total` (counter): tunnel sessions opened
//! - `relay_ws_sessions_active` (gauge): currently live tunnel sessions
//!
//! # Design Decisions
//! - The `metrics` facade keeps call sites cheap; exposition is optional and
//!   only installed when `observability.metrics_enabled` is set

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed (or failed) relay exchange.
pub fn record_relay(method: &str, status: u16, start: Instant) {
    counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn session_opened() {
    counter!("relay_ws_sessions_total").increment(1);
    gauge!("relay_ws_sessions_active").increment(1.0);
}

pub fn session_closed() {
    gauge!("relay_ws_sessions_active").decrement(1.0);
}
