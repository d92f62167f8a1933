//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TelemetryConfig (validated, immutable)
//!     → handed to bootstrap at process start
//! ```
//!
//! # Design Decisions
//! - Config is read once; the facade has no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    LogFormat, LoggingConfig, MetricsConfig, Sampler, SinkKind, TelemetryConfig, TracingConfig,
};
pub use validation::{validate_config, ValidationError};
