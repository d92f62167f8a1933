//! Logger handle used by call sites.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::logging::fanout::FanoutLogSink;
use crate::logging::sink::{KeyValue, LogSink, RuntimeInfo};

/// Cheap, clonable handle over a log sink at a given verbosity.
///
/// `info` consults the sink's `enabled` before writing; `error` always
/// writes.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    level: u32,
}

impl Logger {
    /// Wrap `sink`, initialising it with this logger's own frame.
    pub fn new(mut sink: Box<dyn LogSink>) -> Self {
        sink.init(RuntimeInfo { call_depth: 1 });
        Self {
            sink: Arc::from(sink),
            level: 0,
        }
    }

    /// A logger with no backends.
    pub fn discard() -> Self {
        Self::new(Box::new(FanoutLogSink::new(Vec::new())))
    }

    /// A logger `level` steps more verbose than this one.
    pub fn v(&self, level: u32) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            level: self.level.saturating_add(level),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn enabled(&self) -> bool {
        self.sink.enabled(self.level)
    }

    pub fn info(&self, msg: &str, kvs: &[KeyValue]) {
        if self.enabled() {
            self.sink.info(self.level, msg, kvs);
        }
    }

    pub fn error(&self, err: &(dyn Error + 'static), msg: &str, kvs: &[KeyValue]) {
        self.sink.error(Some(err), msg, kvs);
    }

    /// Error line without an underlying error value.
    pub fn error_msg(&self, msg: &str, kvs: &[KeyValue]) {
        self.sink.error(None, msg, kvs);
    }

    pub fn with_values(&self, kvs: &[KeyValue]) -> Self {
        Self {
            sink: Arc::from(self.sink.with_values(kvs)),
            level: self.level,
        }
    }

    pub fn with_name(&self, name: &str) -> Self {
        Self {
            sink: Arc::from(self.sink.with_name(name)),
            level: self.level,
        }
    }

    pub fn sink(&self) -> &dyn LogSink {
        self.sink.as_ref()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("level", &self.level).finish()
    }
}
