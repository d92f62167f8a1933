//! The log sink capability.

use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;

/// One structured key/value pair attached to a log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Merge key/value lists into a JSON object; later keys overwrite earlier ones.
pub fn to_object<'a>(lists: impl IntoIterator<Item = &'a [KeyValue]>) -> Map<String, Value> {
    let mut object = Map::new();
    for list in lists {
        for kv in list {
            object.insert(kv.key.clone(), kv.value.clone());
        }
    }
    object
}

/// Information handed to a sink once, before its first write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeInfo {
    /// Number of frames between the call site and the sink.
    pub call_depth: usize,
}

/// A logging backend.
///
/// `info` and `error` must not fail; a sink that cannot write drops the
/// line. `with_values` and `with_name` return new sinks and leave the
/// receiver as it was.
pub trait LogSink: Send + Sync {
    /// Receive runtime information. Called once by the owner of the sink.
    fn init(&mut self, info: RuntimeInfo);

    /// Whether a message at verbosity `level` would be written.
    fn enabled(&self, level: u32) -> bool;

    fn info(&self, level: u32, msg: &str, kvs: &[KeyValue]);

    fn error(&self, err: Option<&(dyn Error + 'static)>, msg: &str, kvs: &[KeyValue]);

    /// A sink that attaches `kvs` to every line it writes.
    fn with_values(&self, kvs: &[KeyValue]) -> Box<dyn LogSink>;

    /// A sink with `name` appended to its logger name.
    fn with_name(&self, name: &str) -> Box<dyn LogSink>;
}
