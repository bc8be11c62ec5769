//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cep_requests_total` (counter): inbound requests by service, status
//! - `cep_request_duration_seconds` (histogram): inbound latency by service
//! - `cep_upstream_calls_total` (counter): outbound calls by target, outcome
//!
//! Recording is a no-op until a recorder is installed, so tests and
//! deployments without `metrics_enabled` pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record one inbound request.
pub fn record_request(service: &str, status: u16, start: Instant) {
    metrics::counter!(
        "cep_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("cep_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one outbound call.
pub fn record_upstream(target: &'static str, outcome: &'static str) {
    metrics::counter!("cep_upstream_calls_total", "target" => target, "outcome" => outcome)
        .increment(1);
}
