//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_client_requests_total` (counter): calls by method and outcome
//! - `api_client_request_duration_seconds` (histogram): latency by method
//! - `api_client_token_cache_total` (counter): token lookups by hit/miss
//! - `api_client_token_cache_size` (gauge): cached tokens
//!
//! Recording is a no-op until a recorder is installed with `init_metrics`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics recorder"),
    }
}

/// Record one finished call. `outcome` is the HTTP status or a transport code.
pub fn record_request(method: &str, outcome: &str, start: Instant) {
    counter!(
        "api_client_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("api_client_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a token cache lookup.
pub fn record_token_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("api_client_token_cache_total", "result" => result).increment(1);
}

pub fn record_token_cache_size(size: usize) {
    gauge!("api_client_token_cache_size").set(size as f64);
}
