//! Process lifecycle helpers for the telemetry bootstrap.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → resolve wait_for_signal()
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber (tracer shutdown task, server) wakes
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown out to every background task
//! - Tasks own their receiver; dropping it is how a task detaches

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
