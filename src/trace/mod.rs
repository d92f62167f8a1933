//! Span tracing.
//!
//! # Data Flow
//! ```text
//! Facility::start_span
//!     → SpanTracer (adds correlation ID, forces client kind)
//!     → backend Tracer (TracingTracer by default)
//!     → Span handle stored in the returned Context
//! ```
//!
//! # Design Decisions
//! - Spans are opaque trait objects owned by the backend
//! - Start options fold left to right; later options win
//! - The span handle rides in the Context under a private key

pub mod backend;
pub mod span_tracer;

pub use backend::{TracingProvider, TracingTracer};
pub use span_tracer::SpanTracer;

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;

/// Role of a span in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Server => "server",
            SpanKind::Client => "client",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }
}

/// Attribute value types a backend is expected to accept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::I64(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::F64(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// A key/value recorded on a span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, AttributeValue::String(value.into()))
    }

    pub fn i64(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, AttributeValue::I64(value))
    }
}

/// Option passed when starting a span.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanStartOption {
    Kind(SpanKind),
    Attributes(Vec<Attribute>),
}

/// The result of folding a list of start options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpanConfig {
    pub kind: SpanKind,
    pub attributes: Vec<Attribute>,
}

impl SpanConfig {
    /// Fold `options` in order. The last kind wins; an attribute whose key
    /// was already set replaces the earlier value in place.
    pub fn from_options(options: &[SpanStartOption]) -> Self {
        let mut config = SpanConfig::default();
        for option in options {
            match option {
                SpanStartOption::Kind(kind) => config.kind = *kind,
                SpanStartOption::Attributes(attributes) => {
                    for attribute in attributes {
                        config.set_attribute(attribute.clone());
                    }
                }
            }
        }
        config
    }

    fn set_attribute(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.key == attribute.key) {
            Some(existing) => existing.value = attribute.value,
            None => self.attributes.push(attribute),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|a| a.key == key).map(|a| &a.value)
    }
}

/// Final status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Unset,
    Ok,
    Error { description: String },
}

impl Status {
    pub fn error(description: impl Into<String>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unset => "unset",
            Status::Ok => "ok",
            Status::Error { .. } => "error",
        }
    }
}

/// Handle to a started span. Owned by the backend.
pub trait Span: Send + Sync + fmt::Debug {
    fn set_attribute(&self, attribute: Attribute);

    fn record_error(&self, err: &(dyn Error + 'static));

    fn set_status(&self, status: Status);

    /// End the span. Calls after the first have no effect.
    fn end(&self);

    fn is_recording(&self) -> bool;
}

/// A backend able to start spans.
///
/// The returned context must carry the new span (see [`context_with_span`])
/// so that nested starts and later ends can find it.
pub trait Tracer: Send + Sync {
    fn start(
        &self,
        ctx: Context,
        name: &str,
        options: Vec<SpanStartOption>,
    ) -> (Context, Arc<dyn Span>);
}

impl<T: Tracer + ?Sized> Tracer for Arc<T> {
    fn start(
        &self,
        ctx: Context,
        name: &str,
        options: Vec<SpanStartOption>,
    ) -> (Context, Arc<dyn Span>) {
        (**self).start(ctx, name, options)
    }
}

/// Error raised by a tracer provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),

    #[error("tracer provider already shut down")]
    AlreadyShutdown,
}

/// Source of tracers; owns whatever the backend needs to flush on exit.
pub trait TracerProvider: Send + Sync {
    fn tracer(&self, name: &str) -> Arc<dyn Tracer>;

    /// Flush and release backend resources.
    fn shutdown(&self) -> Result<(), ProviderError>;
}

/// A span that records nothing.
#[derive(Debug, Default)]
pub struct NoopSpan;

impl Span for NoopSpan {
    fn set_attribute(&self, _attribute: Attribute) {}

    fn record_error(&self, _err: &(dyn Error + 'static)) {}

    fn set_status(&self, _status: Status) {}

    fn end(&self) {}

    fn is_recording(&self) -> bool {
        false
    }
}

struct SpanSlot(Arc<dyn Span>);

/// The span most recently stored in `ctx`.
pub fn span_from_context(ctx: &Context) -> Option<Arc<dyn Span>> {
    ctx.get::<SpanSlot>().map(|slot| Arc::clone(&slot.0))
}

/// A context carrying `span` as its current span.
pub fn context_with_span(ctx: &Context, span: Arc<dyn Span>) -> Context {
    ctx.with_value(SpanSlot(span))
}
