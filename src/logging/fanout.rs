//! Fan-out of several log sinks behind one.

use std::error::Error;

use crate::logging::logger::Logger;
use crate::logging::sink::{KeyValue, LogSink, RuntimeInfo};

/// Frames added between the call site and a backend: the fan-out itself
/// and the logger wrapping it.
pub const CALL_DEPTH_OFFSET: usize = 2;

/// Combines an ordered list of sinks into one logical sink.
///
/// Enablement is the AND of all constituents. Writes go to every
/// constituent in registration order. A panicking constituent unwinds
/// through the broadcast; the ones after it are not called.
pub struct FanoutLogSink {
    sinks: Vec<Box<dyn LogSink>>,
}

impl FanoutLogSink {
    pub fn new(sinks: Vec<Box<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn derive(&self, f: impl Fn(&dyn LogSink) -> Box<dyn LogSink>) -> Box<dyn LogSink> {
        let sinks = self.sinks.iter().map(|sink| f(sink.as_ref())).collect();
        Box::new(Self { sinks })
    }
}

impl LogSink for FanoutLogSink {
    fn init(&mut self, mut info: RuntimeInfo) {
        info.call_depth += CALL_DEPTH_OFFSET;
        for sink in &mut self.sinks {
            sink.init(info);
        }
    }

    fn enabled(&self, level: u32) -> bool {
        self.sinks.iter().all(|sink| sink.enabled(level))
    }

    fn info(&self, level: u32, msg: &str, kvs: &[KeyValue]) {
        for sink in &self.sinks {
            sink.info(level, msg, kvs);
        }
    }

    fn error(&self, err: Option<&(dyn Error + 'static)>, msg: &str, kvs: &[KeyValue]) {
        for sink in &self.sinks {
            sink.error(err, msg, kvs);
        }
    }

    fn with_values(&self, kvs: &[KeyValue]) -> Box<dyn LogSink> {
        self.derive(|sink| sink.with_values(kvs))
    }

    fn with_name(&self, name: &str) -> Box<dyn LogSink> {
        self.derive(|sink| sink.with_name(name))
    }
}

/// Build a ready-to-use logger that broadcasts to all of `sinks`.
pub fn new_composite_logger(sinks: Vec<Box<dyn LogSink>>) -> Logger {
    Logger::new(Box::new(FanoutLogSink::new(sinks)))
}
