//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, backend calls, cache, rate limits)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, endpoint, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_backend_calls_total` (counter): backend calls by backend, status
//! - `gateway_cache_total` (counter): cache lookups by result
//! - `gateway_rate_limited_total` (counter): rejected requests by endpoint
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Without an installed recorder every call is a no-op
//! - Transport failures are recorded with status `error`

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

pub fn record_request(method: &str, endpoint: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_call(backend: &str, status: Option<u16>) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    metrics::counter!(
        "gateway_backend_calls_total",
        "backend" => backend.to_string(),
        "status" => status
    )
    .increment(1);
}

pub fn record_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("gateway_cache_total", "result" => result).increment(1);
}

pub fn record_rate_limited(endpoint: &str) {
    metrics::counter!("gateway_rate_limited_total", "endpoint" => endpoint.to_string())
        .increment(1);
}

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}
