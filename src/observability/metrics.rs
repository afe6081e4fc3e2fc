//! Metrics collection and exposition.
//!
//! # Metrics
//! - `origin_responses_total` (counter): origin handler responses by status
//! - `origin_injected_failures_total` (counter): simulated 502s
//! - `origin_throttled_total` (counter): requests rejected by the usage plan
//! - `relay_requests_total` (counter): relay responses by distribution, status
//! - `relay_request_duration_seconds` (histogram): relay latency
//! - `relay_redirects_total` (counter): 307s issued, by `cross_origin`/`same_origin`
//! - `relay_retry_exhausted_total` (counter): transient failures surfaced at the ceiling
//! - `relay_upstream_errors_total` (counter): origin unreachable or timed out
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so hooks stay pure in tests
//! - Labels for distribution and status code only

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_origin_response(status: StatusCode) {
    ::metrics::counter!("origin_responses_total", "status" => status.as_u16().to_string())
        .increment(1);
}

pub fn record_injected_failure() {
    ::metrics::counter!("origin_injected_failures_total").increment(1);
}

pub fn record_throttled() {
    ::metrics::counter!("origin_throttled_total").increment(1);
}

pub fn record_relay_request(distribution: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "relay_requests_total",
        "distribution" => distribution.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "relay_request_duration_seconds",
        "distribution" => distribution.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_redirect(mode: &'static str) {
    ::metrics::counter!("relay_redirects_total", "mode" => mode).increment(1);
}

pub fn record_retry_exhausted() {
    ::metrics::counter!("relay_retry_exhausted_total").increment(1);
}

pub fn record_upstream_error(kind: &'static str) {
    ::metrics::counter!("relay_upstream_errors_total", "kind" => kind).increment(1);
}
