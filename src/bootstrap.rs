//! Startup wiring for logging, tracing and metrics.
//!
//! # Responsibilities
//! - Install the process `tracing` subscriber
//! - Build the composite logger from configured sinks
//! - Register the tracing facility and own the provider shutdown task
//! - Install the Prometheus exporter
//!
//! # Design Decisions
//! - Fail fast: a provider that cannot be built is returned as an error and
//!   nothing is registered
//! - Provider shutdown failures are logged, never returned
//! - Shutdown runs on the blocking pool under a deadline so a stuck backend
//!   cannot hold the process open

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::BuildError;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig, MetricsConfig, SinkKind, TracingConfig};
use crate::facility::SpanFacility;
use crate::logging::{new_composite_logger, JsonLogSink, KeyValue, LogSink, Logger, TracingLogSink};
use crate::metrics;
use crate::registry::TracingRegistry;
use crate::trace::{ProviderError, SpanTracer, TracerProvider, TracingProvider};

/// Failure while bringing up telemetry.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("{context}: {source}")]
    Provider {
        context: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("invalid metrics address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), BootstrapError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }
    Ok(())
}

/// Composite logger over the configured sinks, in configuration order.
pub fn build_logger(config: &LoggingConfig) -> Logger {
    let sinks = config
        .sinks
        .iter()
        .map(|kind| -> Box<dyn LogSink> {
            match kind {
                SinkKind::Tracing => Box::new(TracingLogSink::new(config.verbosity)),
                SinkKind::JsonStdout => Box::new(JsonLogSink::stdout(config.verbosity)),
                SinkKind::JsonStderr => Box::new(JsonLogSink::stderr(config.verbosity)),
            }
        })
        .collect();
    new_composite_logger(sinks)
}

/// A registered tracing backend and its shutdown task.
pub struct TracingHandle {
    provider: Arc<dyn TracerProvider>,
    task: JoinHandle<()>,
}

impl TracingHandle {
    pub fn provider(&self) -> &Arc<dyn TracerProvider> {
        &self.provider
    }

    /// Wait for the shutdown task to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Tracer shutdown task failed");
        }
    }
}

/// Build a [`TracingProvider`] from `config` and register it on `registry`.
///
/// Must be called from within a Tokio runtime.
pub fn register_tracing(
    registry: &TracingRegistry,
    config: &TracingConfig,
    logger: &Logger,
    shutdown: broadcast::Receiver<()>,
) -> Result<TracingHandle, BootstrapError> {
    let provider = TracingProvider::new(config).map_err(|source| BootstrapError::Provider {
        context: "failed to create tracer provider",
        source,
    })?;

    Ok(register_provider(
        registry,
        Arc::new(provider),
        &config.tracer_name,
        Duration::from_secs(config.shutdown_timeout_secs),
        logger,
        shutdown,
    ))
}

/// Register a tracer from `provider` and shut the provider down once
/// `shutdown` fires (or its sender is dropped).
///
/// Must be called from within a Tokio runtime.
pub fn register_provider(
    registry: &TracingRegistry,
    provider: Arc<dyn TracerProvider>,
    tracer_name: &str,
    shutdown_timeout: Duration,
    logger: &Logger,
    mut shutdown: broadcast::Receiver<()>,
) -> TracingHandle {
    let tracer = SpanTracer::new(provider.tracer(tracer_name));
    registry.register(SpanFacility::new(tracer));
    logger.info(
        "Registered tracing facility",
        &[KeyValue::new("tracer", tracer_name)],
    );

    let target = Arc::clone(&provider);
    let logger = logger.clone();
    let task = tokio::spawn(async move {
        // A closed channel means the coordinator is gone; flush anyway.
        let _ = shutdown.recv().await;

        let flush = tokio::task::spawn_blocking(move || target.shutdown());
        match tokio::time::timeout(shutdown_timeout, flush).await {
            Ok(Ok(Ok(()))) => logger.info("Tracer provider shut down", &[]),
            Ok(Ok(Err(e))) => logger.error(&e, "failed to shut down tracer provider", &[]),
            Ok(Err(e)) => logger.error(&e, "failed to shut down tracer provider", &[]),
            Err(e) => logger.error(
                &e,
                "failed to shut down tracer provider",
                &[KeyValue::new("timeout_secs", shutdown_timeout.as_secs())],
            ),
        }
    });

    TracingHandle { provider, task }
}

/// Install the Prometheus exporter if enabled.
///
/// Must be called from within a Tokio runtime.
pub fn register_metrics(config: &MetricsConfig) -> Result<(), BootstrapError> {
    if !config.enabled {
        return Ok(());
    }
    let addr: SocketAddr = config
        .address
        .parse()
        .map_err(|source| BootstrapError::InvalidAddress {
            address: config.address.clone(),
            source,
        })?;
    metrics::init_metrics(addr)?;
    Ok(())
}
