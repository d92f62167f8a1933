//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the telemetry facade.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Log sinks and subscriber settings.
    pub logging: LoggingConfig,

    /// Tracing facility settings.
    pub tracing: TracingConfig,

    /// Metrics exporter settings.
    pub metrics: MetricsConfig,
}

/// Output format of the `tracing` subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// A log backend the composite logger fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Forward to `tracing` events.
    Tracing,
    /// JSON lines on stdout.
    JsonStdout,
    /// JSON lines on stderr.
    JsonStderr,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Subscriber filter directive, overridden by `RUST_LOG`.
    pub filter: String,

    /// Subscriber output format.
    pub format: LogFormat,

    /// Highest verbosity every sink accepts (0 = info only).
    pub verbosity: u32,

    /// Backends of the composite logger, in fan-out order.
    pub sinks: Vec<SinkKind>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
            verbosity: 0,
            sinks: vec![SinkKind::Tracing],
        }
    }
}

/// Span sampling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampler {
    AlwaysOn,
    AlwaysOff,
}

/// Tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Register a tracing facility at startup.
    pub enabled: bool,

    /// Service name attached to every span.
    pub service_name: String,

    /// Instrumentation scope of the registered tracer.
    pub tracer_name: String,

    /// Sampling decision for new spans.
    pub sampler: Sampler,

    /// Deadline for flushing the provider on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "telemetry-facade".to_string(),
            tracer_name: "telemetry-facade".to_string(),
            sampler: Sampler::AlwaysOn,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus exporter.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}
