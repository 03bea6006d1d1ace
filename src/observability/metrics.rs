//! Metrics collection and exposition.
//!
//! # Metrics
//! - `routekit_requests_total` (counter): requests by method, status, route
//! - `routekit_request_duration_seconds` (histogram): latency distribution
//! - `routekit_cache_lookups_total` (counter): response cache hits and misses
//! - `routekit_route_reloads_total` (counter): dev rebuilds by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    counter!("routekit_requests_total", &labels[..]).increment(1);
    histogram!("routekit_request_duration_seconds", &labels[..]).record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("routekit_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_route_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("routekit_route_reloads_total", "outcome" => outcome).increment(1);
}
