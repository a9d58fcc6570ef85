//! Metrics collection and exposition.
//!
//! # Metrics
//! - `apigate_requests_total` (counter): requests by method, status
//! - `apigate_request_duration_seconds` (histogram): latency by method
//!
//! # Design Decisions
//! - Recording is always on; without an installed recorder it is a no-op
//! - Prometheus exposition is opt-in via config

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "apigate_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "apigate_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
