//! Process-wide tracing registration point.
//!
//! # Responsibilities
//! - Hold at most one active tracing facility
//! - Dispatch span and transport calls to it
//! - Degrade every operation to a no-op while nothing is registered
//!
//! # Design Decisions
//! - The facility sits behind an `ArcSwapOption`: reads are lock-free loads,
//!   registration is an atomic store, so a late `register` never races
//!   in-flight calls
//! - Registering again replaces the facility (last write wins); there is
//!   no way back to the unregistered state
//! - Every operation is total; callers never branch on registration state

use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;

use crate::context::Context;
use crate::transport::Transport;

/// The capability set a tracing backend registers.
pub trait Facility: Send + Sync {
    /// Wrap a base transport so outbound requests are traced.
    fn new_transport(&self, base: Transport) -> Transport;

    /// Start a span named `name`, returning a context that carries it.
    fn start_span(&self, ctx: Context, name: &str) -> Context;

    /// End the span recorded in `ctx`.
    fn end_span(&self, ctx: &Context, status_code: u16, err: Option<&(dyn Error + 'static)>);
}

/// Holds the active facility.
pub struct TracingRegistry {
    facility: ArcSwapOption<Box<dyn Facility>>,
}

impl TracingRegistry {
    /// Create an unregistered registry.
    pub fn new() -> Self {
        Self {
            facility: ArcSwapOption::empty(),
        }
    }

    /// Install `facility`, replacing any previous one.
    pub fn register<F: Facility + 'static>(&self, facility: F) {
        let facility: Box<dyn Facility> = Box::new(facility);
        let previous = self.facility.swap(Some(Arc::new(facility)));
        if previous.is_some() {
            tracing::debug!("Tracing facility replaced");
        } else {
            tracing::debug!("Tracing facility registered");
        }
    }

    /// True once a facility has been registered.
    pub fn is_enabled(&self) -> bool {
        self.facility.load().is_some()
    }

    /// Wrap `base` with the registered facility.
    ///
    /// `None` means nothing is registered and `base` should be used as is.
    pub fn new_transport(&self, base: Transport) -> Option<Transport> {
        self.facility
            .load_full()
            .map(|facility| facility.new_transport(base))
    }

    /// Start a span. Returns `ctx` itself while unregistered.
    pub fn start_span(&self, ctx: Context, name: &str) -> Context {
        match self.facility.load_full() {
            Some(facility) => facility.start_span(ctx, name),
            None => ctx,
        }
    }

    /// End the span in `ctx`. No effect while unregistered.
    pub fn end_span(&self, ctx: &Context, status_code: u16, err: Option<&(dyn Error + 'static)>) {
        if let Some(facility) = self.facility.load_full() {
            facility.end_span(ctx, status_code, err);
        }
    }
}

impl Default for TracingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TracingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingRegistry")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

static GLOBAL: OnceLock<TracingRegistry> = OnceLock::new();

/// The process-wide registry behind the free functions below.
pub fn global() -> &'static TracingRegistry {
    GLOBAL.get_or_init(TracingRegistry::new)
}

/// Register `facility` as the process-wide tracer. Last write wins.
pub fn register<F: Facility + 'static>(facility: F) {
    global().register(facility);
}

pub fn is_enabled() -> bool {
    global().is_enabled()
}

/// See [`TracingRegistry::new_transport`].
pub fn new_transport(base: Transport) -> Option<Transport> {
    global().new_transport(base)
}

/// See [`TracingRegistry::start_span`].
pub fn start_span(ctx: Context, name: &str) -> Context {
    global().start_span(ctx, name)
}

/// See [`TracingRegistry::end_span`].
pub fn end_span(ctx: &Context, status_code: u16, err: Option<&(dyn Error + 'static)>) {
    global().end_span(ctx, status_code, err);
}
