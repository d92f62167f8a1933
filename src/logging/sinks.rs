//! Built-in log backends.

use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use tracing::Level;

use crate::logging::sink::{to_object, KeyValue, LogSink, RuntimeInfo};

fn join_name(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Verbosity 0 is info, 1 is debug, anything higher is trace.
fn tracing_level(level: u32) -> Level {
    match level {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Sink forwarding lines as `tracing` events.
///
/// Key/values are rendered as one JSON `fields` value, since event field
/// names must be known at compile time. Callsite metadata comes from
/// `tracing` itself, so the call depth is only kept for derived sinks.
#[derive(Debug, Clone)]
pub struct TracingLogSink {
    name: String,
    values: Vec<KeyValue>,
    max_verbosity: u32,
    call_depth: usize,
}

impl TracingLogSink {
    pub fn new(max_verbosity: u32) -> Self {
        Self {
            name: String::new(),
            values: Vec::new(),
            max_verbosity,
            call_depth: 0,
        }
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    fn fields(&self, kvs: &[KeyValue]) -> Value {
        Value::Object(to_object([self.values.as_slice(), kvs]))
    }
}

impl LogSink for TracingLogSink {
    fn init(&mut self, info: RuntimeInfo) {
        self.call_depth = info.call_depth;
    }

    fn enabled(&self, level: u32) -> bool {
        if level > self.max_verbosity {
            return false;
        }
        match tracing_level(level) {
            Level::INFO => tracing::enabled!(Level::INFO),
            Level::DEBUG => tracing::enabled!(Level::DEBUG),
            _ => tracing::enabled!(Level::TRACE),
        }
    }

    fn info(&self, level: u32, msg: &str, kvs: &[KeyValue]) {
        let fields = self.fields(kvs);
        let logger = self.name.as_str();
        match tracing_level(level) {
            Level::INFO => tracing::info!(logger, v = level, fields = %fields, "{}", msg),
            Level::DEBUG => tracing::debug!(logger, v = level, fields = %fields, "{}", msg),
            _ => tracing::trace!(logger, v = level, fields = %fields, "{}", msg),
        }
    }

    fn error(&self, err: Option<&(dyn Error + 'static)>, msg: &str, kvs: &[KeyValue]) {
        let fields = self.fields(kvs);
        let logger = self.name.as_str();
        let error = err.map(ToString::to_string).unwrap_or_default();
        tracing::error!(logger, error = %error, fields = %fields, "{}", msg);
    }

    fn with_values(&self, kvs: &[KeyValue]) -> Box<dyn LogSink> {
        let mut sink = self.clone();
        sink.values.extend_from_slice(kvs);
        Box::new(sink)
    }

    fn with_name(&self, name: &str) -> Box<dyn LogSink> {
        let mut sink = self.clone();
        sink.name = join_name(&self.name, name);
        Box::new(sink)
    }
}

/// Sink writing one JSON object per line.
///
/// Filters by its own maximum verbosity. Write and encoding failures drop
/// the line.
pub struct JsonLogSink<W> {
    writer: Arc<Mutex<W>>,
    name: String,
    values: Vec<KeyValue>,
    max_verbosity: u32,
    call_depth: usize,
}

impl<W> Clone for JsonLogSink<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            name: self.name.clone(),
            values: self.values.clone(),
            max_verbosity: self.max_verbosity,
            call_depth: self.call_depth,
        }
    }
}

impl<W> fmt::Debug for JsonLogSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLogSink")
            .field("name", &self.name)
            .field("max_verbosity", &self.max_verbosity)
            .finish()
    }
}

impl JsonLogSink<io::Stdout> {
    pub fn stdout(max_verbosity: u32) -> Self {
        Self::new(io::stdout(), max_verbosity)
    }
}

impl JsonLogSink<io::Stderr> {
    pub fn stderr(max_verbosity: u32) -> Self {
        Self::new(io::stderr(), max_verbosity)
    }
}

impl<W: Write + Send + 'static> JsonLogSink<W> {
    pub fn new(writer: W, max_verbosity: u32) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            name: String::new(),
            values: Vec::new(),
            max_verbosity,
            call_depth: 0,
        }
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    fn write_line(&self, mut line: Map<String, Value>, kvs: &[KeyValue]) {
        if !self.name.is_empty() {
            line.insert("logger".into(), Value::from(self.name.as_str()));
        }
        for (key, value) in to_object([self.values.as_slice(), kvs]) {
            line.entry(key).or_insert(value);
        }

        let Ok(mut encoded) = serde_json::to_vec(&Value::Object(line)) else {
            return;
        };
        encoded.push(b'\n');
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.write_all(&encoded);
            let _ = writer.flush();
        }
    }
}

fn timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

impl<W: Write + Send + 'static> LogSink for JsonLogSink<W> {
    fn init(&mut self, info: RuntimeInfo) {
        self.call_depth = info.call_depth;
    }

    fn enabled(&self, level: u32) -> bool {
        level <= self.max_verbosity
    }

    fn info(&self, level: u32, msg: &str, kvs: &[KeyValue]) {
        if !self.enabled(level) {
            return;
        }
        let mut line = Map::new();
        line.insert("ts".into(), Value::from(timestamp()));
        line.insert("level".into(), Value::from("info"));
        line.insert("v".into(), Value::from(level));
        line.insert("msg".into(), Value::from(msg));
        self.write_line(line, kvs);
    }

    fn error(&self, err: Option<&(dyn Error + 'static)>, msg: &str, kvs: &[KeyValue]) {
        let mut line = Map::new();
        line.insert("ts".into(), Value::from(timestamp()));
        line.insert("level".into(), Value::from("error"));
        line.insert("msg".into(), Value::from(msg));
        if let Some(err) = err {
            line.insert("error".into(), Value::from(err.to_string()));
        }
        self.write_line(line, kvs);
    }

    fn with_values(&self, kvs: &[KeyValue]) -> Box<dyn LogSink> {
        let mut sink = self.clone();
        sink.values.extend_from_slice(kvs);
        Box::new(sink)
    }

    fn with_name(&self, name: &str) -> Box<dyn LogSink> {
        let mut sink = self.clone();
        sink.name = join_name(&self.name, name);
        Box::new(sink)
    }
}
