//! Observability facade: composite structured logging and a process-wide
//! tracing registry that degrades to no-ops until a backend registers.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod facility;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod trace;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::TelemetryConfig;
pub use context::{Context, CorrelationId, CORRELATION_ID_KEY};
pub use facility::SpanFacility;
pub use lifecycle::Shutdown;
pub use logging::{new_composite_logger, KeyValue, LogSink, Logger};
pub use registry::{Facility, TracingRegistry};
pub use trace::{Span, SpanTracer, Tracer, TracerProvider};
pub use transport::Transport;
