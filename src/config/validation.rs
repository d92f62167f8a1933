//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Validate the subscriber filter directive
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TelemetryConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::TelemetryConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("tracing.service_name must not be empty")]
    EmptyServiceName,

    #[error("tracing.tracer_name must not be empty")]
    EmptyTracerName,

    #[error("tracing.shutdown_timeout_secs must be greater than zero")]
    ZeroShutdownTimeout,

    #[error("metrics.address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("logging.filter {filter:?} is invalid: {reason}")]
    InvalidFilter { filter: String, reason: String },
}

/// Check `config` and collect every problem found.
pub fn validate_config(config: &TelemetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.tracing.service_name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }
    if config.tracing.tracer_name.trim().is_empty() {
        errors.push(ValidationError::EmptyTracerName);
    }
    if config.tracing.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::ZeroShutdownTimeout);
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(config.metrics.address.clone()));
    }

    if let Err(e) = EnvFilter::try_new(&config.logging.filter) {
        errors.push(ValidationError::InvalidFilter {
            filter: config.logging.filter.clone(),
            reason: e.to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
