//! Backend tracer that records spans through the `tracing` crate.
//!
//! Spans use the field conventions of `tracing-opentelemetry`
//! (`otel.name`, `otel.kind`, `otel.status_code`), so a subscriber with an
//! OpenTelemetry layer exports them without further mapping.

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::field::{display, Empty};

use crate::config::{Sampler, TracingConfig};
use crate::context::Context;
use crate::trace::{
    context_with_span, Attribute, NoopSpan, ProviderError, Span, SpanConfig, SpanStartOption,
    Status, Tracer, TracerProvider,
};

/// Parent `tracing` span of the context, for nesting.
struct TracingParent(tracing::Span);

#[derive(Debug, Default)]
struct SpanState {
    attributes: Vec<Attribute>,
    status: Status,
    ended: bool,
}

/// A span backed by a `tracing::Span`.
///
/// Attributes are buffered and recorded as one JSON field when the span
/// ends, since `tracing` fields are fixed at creation time.
#[derive(Debug)]
pub struct TracingSpan {
    span: tracing::Span,
    state: Mutex<SpanState>,
}

impl TracingSpan {
    fn new(span: tracing::Span, attributes: Vec<Attribute>) -> Self {
        Self {
            span,
            state: Mutex::new(SpanState {
                attributes,
                ..SpanState::default()
            }),
        }
    }
}

impl Span for TracingSpan {
    fn set_attribute(&self, attribute: Attribute) {
        if let Ok(mut state) = self.state.lock() {
            if state.ended {
                return;
            }
            match state.attributes.iter_mut().find(|a| a.key == attribute.key) {
                Some(existing) => existing.value = attribute.value,
                None => state.attributes.push(attribute),
            }
        }
    }

    fn record_error(&self, err: &(dyn Error + 'static)) {
        self.span.record("error", display(err));
    }

    fn set_status(&self, status: Status) {
        if let Ok(mut state) = self.state.lock() {
            if !state.ended {
                state.status = status;
            }
        }
    }

    fn end(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.ended {
            return;
        }
        state.ended = true;

        let attributes = serde_json::to_string(&state.attributes).unwrap_or_default();
        self.span.record("attributes", display(attributes));
        self.span.record("otel.status_code", state.status.as_str());
        if let Status::Error { description } = &state.status {
            self.span.record("otel.status_description", description.as_str());
        }
        tracing::trace!(parent: &self.span, "span ended");
    }

    fn is_recording(&self) -> bool {
        self.state.lock().map(|state| !state.ended).unwrap_or(false)
    }
}

/// Starts `tracing` spans for one instrumentation scope.
#[derive(Debug, Clone)]
pub struct TracingTracer {
    scope: String,
    service_name: String,
    sampler: Sampler,
    shut_down: Arc<AtomicBool>,
}

impl TracingTracer {
    pub fn new(
        scope: impl Into<String>,
        service_name: impl Into<String>,
        sampler: Sampler,
    ) -> Self {
        Self {
            scope: scope.into(),
            service_name: service_name.into(),
            sampler,
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    fn recording(&self) -> bool {
        self.sampler == Sampler::AlwaysOn && !self.shut_down.load(Ordering::Acquire)
    }
}

impl Tracer for TracingTracer {
    fn start(
        &self,
        ctx: Context,
        name: &str,
        options: Vec<SpanStartOption>,
    ) -> (Context, Arc<dyn Span>) {
        if !self.recording() {
            let span: Arc<dyn Span> = Arc::new(NoopSpan);
            return (context_with_span(&ctx, Arc::clone(&span)), span);
        }

        let config = SpanConfig::from_options(&options);
        let parent = ctx.get::<TracingParent>().and_then(|p| p.0.id());
        let span = tracing::info_span!(
            parent: parent,
            "span",
            otel.name = %name,
            otel.kind = config.kind.as_str(),
            otel.scope = %self.scope,
            service.name = %self.service_name,
            otel.status_code = Empty,
            otel.status_description = Empty,
            attributes = Empty,
            error = Empty,
        );

        let handle: Arc<dyn Span> = Arc::new(TracingSpan::new(span.clone(), config.attributes));
        let ctx = context_with_span(&ctx.with_value(TracingParent(span)), Arc::clone(&handle));
        (ctx, handle)
    }
}

/// Provider handing out [`TracingTracer`]s that share one shutdown switch.
#[derive(Debug)]
pub struct TracingProvider {
    service_name: String,
    sampler: Sampler,
    shut_down: Arc<AtomicBool>,
}

impl TracingProvider {
    pub fn new(config: &TracingConfig) -> Result<Self, ProviderError> {
        if config.service_name.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("service name is empty".into()));
        }
        Ok(Self {
            service_name: config.service_name.clone(),
            sampler: config.sampler,
            shut_down: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl TracerProvider for TracingProvider {
    fn tracer(&self, name: &str) -> Arc<dyn Tracer> {
        Arc::new(TracingTracer {
            scope: name.to_string(),
            service_name: self.service_name.clone(),
            sampler: self.sampler,
            shut_down: Arc::clone(&self.shut_down),
        })
    }

    fn shutdown(&self) -> Result<(), ProviderError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Err(ProviderError::AlreadyShutdown);
        }
        tracing::debug!(service = %self.service_name, "tracer provider shut down");
        Ok(())
    }
}
