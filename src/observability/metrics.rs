//! Metrics collection and exposition.
//!
//! # Metrics
//! - `loadgate_requests_total` (counter): requests by method, status, backend
//! - `loadgate_request_duration_seconds` (histogram): latency distribution
//! - `loadgate_rate_limited_total` (counter): rejected requests
//! - `loadgate_no_backend_total` (counter): requests with no live backend
//! - `loadgate_backend_live` (gauge): 1=live, 0=down, per backend
//! - `loadgate_rate_limit_buckets` (gauge): clients with a bucket

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "loadgate_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!("loadgate_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("loadgate_rate_limited_total").increment(1);
}

pub fn record_no_backend() {
    counter!("loadgate_no_backend_total").increment(1);
}

pub fn record_backend_health(backend: &str, live: bool) {
    gauge!("loadgate_backend_live", "backend" => backend.to_string()).set(if live { 1.0 } else { 0.0 });
}

pub fn set_rate_limit_buckets(count: usize) {
    gauge!("loadgate_rate_limit_buckets").set(count as f64);
}
