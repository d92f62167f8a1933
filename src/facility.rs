//! Default tracing facility built on a backend tracer.
//!
//! # Responsibilities
//! - Start spans for named operations and outbound requests
//! - Classify the span outcome from an HTTP status and an optional error
//! - Wrap transports so every request gets a span
//!
//! # Design Decisions
//! - Errors are passed to the span untouched; the backend formats them
//! - A status of 400 or above marks the span as failed, as does any error
//! - Ending a context without a span is a no-op

use std::error::Error;
use std::sync::Arc;

use crate::context::Context;
use crate::metrics;
use crate::registry::Facility;
use crate::trace::{span_from_context, Attribute, Status, Tracer};
use crate::transport::{boxed, TracedTransport, Transport};

/// Attribute key for the HTTP status recorded at span end.
pub const HTTP_STATUS_CODE_KEY: &str = "http.status_code";

/// Facility that traces through an arbitrary [`Tracer`].
#[derive(Clone)]
pub struct SpanFacility {
    tracer: Arc<dyn Tracer>,
}

impl SpanFacility {
    pub fn new<T: Tracer + 'static>(tracer: T) -> Self {
        Self {
            tracer: Arc::new(tracer),
        }
    }

    /// Status to record for a response with `status_code` and `err`.
    pub fn classify(status_code: u16, err: Option<&(dyn Error + 'static)>) -> Status {
        match err {
            Some(err) => Status::error(err.to_string()),
            None if status_code >= 400 => Status::error(format!("HTTP status {}", status_code)),
            None => Status::Ok,
        }
    }
}

impl Facility for SpanFacility {
    fn new_transport(&self, base: Transport) -> Transport {
        boxed(TracedTransport::new(base, self.clone()))
    }

    fn start_span(&self, ctx: Context, name: &str) -> Context {
        let (ctx, _span) = self.tracer.start(ctx, name, Vec::new());
        metrics::record_span_started();
        ctx
    }

    fn end_span(&self, ctx: &Context, status_code: u16, err: Option<&(dyn Error + 'static)>) {
        let Some(span) = span_from_context(ctx) else {
            tracing::trace!("end_span called on a context without a span");
            return;
        };

        span.set_attribute(Attribute::i64(HTTP_STATUS_CODE_KEY, i64::from(status_code)));
        if let Some(err) = err {
            span.record_error(err);
        }
        let status = Self::classify(status_code, err);
        metrics::record_span_ended(status.as_str());
        span.set_status(status);
        span.end();
    }
}
