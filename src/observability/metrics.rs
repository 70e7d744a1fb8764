//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relay invocations by method, status, outcome
//! - `relay_request_duration_seconds` (histogram): end-to-end relay latency
//! - `relay_rate_limited_total` (counter): requests rejected by the rate limiter

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Label value for a caller-supplied method. Anything outside the standard
/// verbs, including unparseable input, collapses to `OTHER`.
pub fn method_label(method: Option<&Method>) -> &'static str {
    match method {
        Some(m) if m == Method::GET => "GET",
        Some(m) if m == Method::POST => "POST",
        Some(m) if m == Method::PUT => "PUT",
        Some(m) if m == Method::PATCH => "PATCH",
        Some(m) if m == Method::DELETE => "DELETE",
        Some(m) if m == Method::HEAD => "HEAD",
        Some(m) if m == Method::OPTIONS => "OPTIONS",
        Some(m) if m == Method::CONNECT => "CONNECT",
        Some(m) if m == Method::TRACE => "TRACE",
        _ => "OTHER",
    }
}

/// Record one finished relay invocation.
pub fn record_relay(method: &'static str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "method" => method,
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("relay_rate_limited_total").increment(1);
}
