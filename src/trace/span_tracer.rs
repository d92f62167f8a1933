//! Tracer wrapper that stamps every span with the correlation ID.

use std::sync::Arc;

use crate::context::{ensure_correlation_id, Context, CORRELATION_ID_KEY};
use crate::trace::{Attribute, Span, SpanKind, SpanStartOption, Tracer};

/// Wraps a backend tracer.
///
/// Every span it starts is a client span carrying the correlation ID of
/// its context under [`CORRELATION_ID_KEY`]. Both are appended after the
/// caller's options, so they win over caller values for the same keys.
#[derive(Clone)]
pub struct SpanTracer {
    inner: Arc<dyn Tracer>,
}

impl SpanTracer {
    pub fn new(inner: Arc<dyn Tracer>) -> Self {
        Self { inner }
    }
}

impl Tracer for SpanTracer {
    fn start(
        &self,
        ctx: Context,
        name: &str,
        mut options: Vec<SpanStartOption>,
    ) -> (Context, Arc<dyn Span>) {
        let (ctx, correlation_id) = ensure_correlation_id(ctx);
        options.push(SpanStartOption::Kind(SpanKind::Client));
        options.push(SpanStartOption::Attributes(vec![Attribute::string(
            CORRELATION_ID_KEY,
            correlation_id.as_str(),
        )]));
        self.inner.start(ctx, name, options)
    }
}
