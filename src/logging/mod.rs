//! Structured logging.
//!
//! # Data Flow
//! ```text
//! call site
//!     → Logger (verbosity check, derived names/values)
//!     → FanoutLogSink (conjunctive enabled, broadcast writes)
//!     → [TracingLogSink, JsonLogSink, ...] (independent backends)
//! ```
//!
//! # Design Decisions
//! - Loggers are built once at startup and never mutated
//! - Every `with_*` call allocates a new sink value
//! - Backends that suppress output do their own filtering

pub mod fanout;
pub mod logger;
pub mod sink;
pub mod sinks;

pub use fanout::{new_composite_logger, FanoutLogSink, CALL_DEPTH_OFFSET};
pub use logger::Logger;
pub use sink::{KeyValue, LogSink, RuntimeInfo};
pub use sinks::{JsonLogSink, TracingLogSink};
