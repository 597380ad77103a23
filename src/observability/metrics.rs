//! Metrics collection and exposition.
//!
//! # Metrics
//! - `upstream_requests_total` (counter): attempts by provider, outcome
//! - `upstream_request_duration_seconds` (histogram): per-attempt latency
//! - `upstream_retries_total` (counter): retries within a provider
//! - `upstream_fallbacks_total` (counter): moves to the next provider
//! - `upstream_circuit_open` (gauge): 1=open, 0=closed
//! - `upstream_rate_limit_wait_seconds` (histogram): pacing delays
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::Instant;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// One finished attempt. `outcome` is "success" or an error kind name.
pub fn record_attempt(provider: &str, outcome: &'static str, started: Instant) {
    ::metrics::counter!(
        "upstream_requests_total",
        "provider" => provider.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!(
        "upstream_request_duration_seconds",
        "provider" => provider.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_retry(provider: &str) {
    ::metrics::counter!("upstream_retries_total", "provider" => provider.to_string()).increment(1);
}

pub fn record_fallback(from: &str) {
    ::metrics::counter!("upstream_fallbacks_total", "from" => from.to_string()).increment(1);
}

pub fn record_circuit_state(provider: &str, open: bool) {
    ::metrics::gauge!("upstream_circuit_open", "provider" => provider.to_string())
        .set(if open { 1.0 } else { 0.0 });
}

pub fn record_rate_limit_wait(provider: &str, wait: Duration) {
    ::metrics::histogram!(
        "upstream_rate_limit_wait_seconds",
        "provider" => provider.to_string()
    )
    .record(wait.as_secs_f64());
}
