//! Explicit propagation context and correlation IDs.
//!
//! # Responsibilities
//! - Carry per-operation values through call chains without ambient state
//! - Hold the correlation ID under a key no application code can name
//! - Create the correlation ID lazily, never change it afterwards
//!
//! # Design Decisions
//! - `Context` is immutable; every insertion returns a new value
//! - Values are keyed by Rust type, so a private slot type is a private key
//! - Cloning is an `Arc` bump; the map itself is copied only on insertion

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Attribute key (and outbound header name) for the correlation ID.
pub const CORRELATION_ID_KEY: &str = "x-correlation-id";

type Entries = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Immutable bag of typed values passed explicitly through every call.
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<Entries>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new context that also carries `value`.
    ///
    /// A value of the same type already present is shadowed in the new
    /// context; the receiver is left untouched.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut entries = Entries::clone(&self.entries);
        entries.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Look up the value stored for type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    /// True if both contexts share the same underlying storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Number of values stored, reserved slots included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.len())
            .field("correlation_id", &correlation_id(self))
            .finish()
    }
}

/// Opaque token uniting the spans and log lines of one logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh random ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reserved slot. Private, so no application type can collide with it.
struct CorrelationSlot(CorrelationId);

/// Correlation ID carried by `ctx`, if any.
pub fn correlation_id(ctx: &Context) -> Option<&CorrelationId> {
    ctx.get::<CorrelationSlot>().map(|slot| &slot.0)
}

/// Return a context guaranteed to carry a correlation ID, along with the ID.
///
/// When `ctx` already carries one it is returned unchanged.
pub fn ensure_correlation_id(ctx: Context) -> (Context, CorrelationId) {
    if let Some(existing) = correlation_id(&ctx) {
        let id = existing.clone();
        return (ctx, id);
    }
    let id = CorrelationId::generate();
    let ctx = ctx.with_value(CorrelationSlot(id.clone()));
    (ctx, id)
}

/// Seed `ctx` with an ID received from elsewhere (e.g. an inbound header).
///
/// An ID already present wins; the supplied one is then ignored.
pub fn adopt_correlation_id(ctx: Context, id: impl Into<CorrelationId>) -> Context {
    if correlation_id(&ctx).is_some() {
        return ctx;
    }
    ctx.with_value(CorrelationSlot(id.into()))
}
