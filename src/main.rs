//! Demo service for the telemetry facade.
//!
//! Loads a TOML config (or defaults), wires logging, tracing and metrics,
//! and serves a single endpoint that traces each request under the
//! caller's correlation ID.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use telemetry_facade::bootstrap::{self, TracingHandle};
use telemetry_facade::config::{load_config, TelemetryConfig};
use telemetry_facade::context::{adopt_correlation_id, correlation_id, Context};
use telemetry_facade::lifecycle::{wait_for_signal, Shutdown};
use telemetry_facade::logging::{KeyValue, Logger};
use telemetry_facade::registry;
use telemetry_facade::transport::hyper_transport;
use telemetry_facade::CORRELATION_ID_KEY;

#[derive(Parser)]
#[command(name = "telemetry-facade")]
#[command(about = "Demo service for the telemetry facade", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address the demo endpoint listens on.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TelemetryConfig::default(),
    };

    bootstrap::init_subscriber(&config.logging)?;
    let logger = bootstrap::build_logger(&config.logging).with_name("telemetry-facade");
    tracing::info!(
        tracing_enabled = config.tracing.enabled,
        metrics_enabled = config.metrics.enabled,
        "Configuration loaded"
    );

    bootstrap::register_metrics(&config.metrics)?;

    let shutdown = Shutdown::new();
    let tracing_handle: Option<TracingHandle> = if config.tracing.enabled {
        Some(bootstrap::register_tracing(
            registry::global(),
            &config.tracing,
            &logger,
            shutdown.subscribe(),
        )?)
    } else {
        None
    };

    let traced = registry::new_transport(hyper_transport()).is_some();
    logger.info("Outbound transport ready", &[KeyValue::new("traced", traced)]);

    let app = Router::new()
        .route("/work", get(work_handler))
        .with_state(logger.clone())
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(cli.listen).await?;
    logger.info(
        "Listening for connections",
        &[KeyValue::new("address", listener.local_addr()?.to_string())],
    );

    let mut server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.recv().await;
        })
        .await?;

    if let Some(handle) = tracing_handle {
        handle.join().await;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Trace one unit of work under the caller's correlation ID, if any.
async fn work_handler(State(logger): State<Logger>, headers: HeaderMap) -> Json<serde_json::Value> {
    let mut ctx = Context::new();
    if let Some(id) = headers.get(CORRELATION_ID_KEY).and_then(|v| v.to_str().ok()) {
        ctx = adopt_correlation_id(ctx, id);
    }

    let ctx = registry::start_span(ctx, "HandleWork");
    let id = correlation_id(&ctx).map(|id| id.to_string());
    logger.info(
        "Handling work",
        &[KeyValue::new("correlation_id", id.clone().unwrap_or_default())],
    );
    registry::end_span(&ctx, 200, None);

    Json(json!({ "correlation_id": id }))
}
