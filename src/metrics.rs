//! Metrics collection and exposition.
//!
//! # Metrics
//! - `telemetry_spans_started_total` (counter): spans started through a facility
//! - `telemetry_spans_ended_total` (counter): spans ended, by `status`
//! - `telemetry_transport_request_duration_seconds` (histogram): traced
//!   outbound request latency, by `status`
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus exporter is installed by bootstrap, never implicitly

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with a scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_span_started() {
    ::metrics::counter!("telemetry_spans_started_total").increment(1);
}

pub fn record_span_ended(status: &'static str) {
    ::metrics::counter!("telemetry_spans_ended_total", "status" => status).increment(1);
}

pub fn record_transport_request(status: u16, started: Instant) {
    ::metrics::histogram!(
        "telemetry_transport_request_duration_seconds",
        "status" => status.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}
