//! Recording doubles shared by the unit tests.

use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response};
use tower::service_fn;
use tracing_subscriber::fmt::MakeWriter;

use crate::context::{correlation_id, Context, CORRELATION_ID_KEY};
use crate::logging::{KeyValue, LogSink, RuntimeInfo};
use crate::registry::Facility;
use crate::trace::{
    context_with_span, Attribute, AttributeValue, Span, SpanStartOption, Status, Tracer,
};
use crate::transport::{boxed, Transport};

// --- Log sinks ---

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLine {
    pub sink: usize,
    /// `None` for error lines.
    pub level: Option<u32>,
    pub msg: String,
    pub kvs: Vec<KeyValue>,
    pub values: Vec<KeyValue>,
    pub name: String,
    pub error: Option<String>,
}

#[derive(Default)]
struct SinkLogInner {
    lines: Vec<RecordedLine>,
    enabled_queries: Vec<usize>,
    init_depths: Vec<usize>,
}

/// Log shared by every recording sink of one test.
#[derive(Clone, Default)]
pub struct SinkLog(Arc<Mutex<SinkLogInner>>);

impl SinkLog {
    pub fn lines(&self) -> Vec<RecordedLine> {
        self.0.lock().unwrap().lines.clone()
    }

    pub fn enabled_queries(&self) -> Vec<usize> {
        self.0.lock().unwrap().enabled_queries.clone()
    }

    pub fn init_depths(&self) -> Vec<usize> {
        self.0.lock().unwrap().init_depths.clone()
    }
}

#[derive(Clone)]
pub struct RecordingSink {
    id: usize,
    enabled: bool,
    max_level: u32,
    name: String,
    values: Vec<KeyValue>,
    log: SinkLog,
}

impl RecordingSink {
    pub fn new(id: usize, enabled: bool, log: SinkLog) -> Self {
        Self {
            id,
            enabled,
            max_level: u32::MAX,
            name: String::new(),
            values: Vec::new(),
            log,
        }
    }

    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level;
        self
    }

    fn record(&self, level: Option<u32>, msg: &str, kvs: &[KeyValue], error: Option<String>) {
        self.log.0.lock().unwrap().lines.push(RecordedLine {
            sink: self.id,
            level,
            msg: msg.to_string(),
            kvs: kvs.to_vec(),
            values: self.values.clone(),
            name: self.name.clone(),
            error,
        });
    }
}

impl LogSink for RecordingSink {
    fn init(&mut self, info: RuntimeInfo) {
        self.log.0.lock().unwrap().init_depths.push(info.call_depth);
    }

    fn enabled(&self, level: u32) -> bool {
        self.log.0.lock().unwrap().enabled_queries.push(self.id);
        self.enabled && level <= self.max_level
    }

    fn info(&self, level: u32, msg: &str, kvs: &[KeyValue]) {
        self.record(Some(level), msg, kvs, None);
    }

    fn error(&self, err: Option<&(dyn Error + 'static)>, msg: &str, kvs: &[KeyValue]) {
        self.record(None, msg, kvs, err.map(ToString::to_string));
    }

    fn with_values(&self, kvs: &[KeyValue]) -> Box<dyn LogSink> {
        let mut sink = self.clone();
        sink.values.extend_from_slice(kvs);
        Box::new(sink)
    }

    fn with_name(&self, name: &str) -> Box<dyn LogSink> {
        let mut sink = self.clone();
        sink.name = if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.name, name)
        };
        Box::new(sink)
    }
}

/// In-memory writer for sinks that write bytes.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = SharedBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// --- Tracer ---

#[derive(Debug, Clone)]
pub struct RecordedStart {
    pub name: String,
    pub options: Vec<SpanStartOption>,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Default)]
struct SpanRecord {
    attributes: Vec<Attribute>,
    errors: Vec<String>,
    status: Status,
    ended: usize,
}

#[derive(Debug)]
pub struct RecordingSpan {
    name: String,
    record: Mutex<SpanRecord>,
}

impl RecordingSpan {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ended(&self) -> usize {
        self.record.lock().unwrap().ended
    }

    pub fn errors(&self) -> Vec<String> {
        self.record.lock().unwrap().errors.clone()
    }

    pub fn status(&self) -> Status {
        self.record.lock().unwrap().status.clone()
    }

    pub fn attribute(&self, key: &str) -> Option<AttributeValue> {
        self.record
            .lock()
            .unwrap()
            .attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.clone())
    }
}

impl Span for RecordingSpan {
    fn set_attribute(&self, attribute: Attribute) {
        self.record.lock().unwrap().attributes.push(attribute);
    }

    fn record_error(&self, err: &(dyn Error + 'static)) {
        self.record.lock().unwrap().errors.push(err.to_string());
    }

    fn set_status(&self, status: Status) {
        self.record.lock().unwrap().status = status;
    }

    fn end(&self) {
        self.record.lock().unwrap().ended += 1;
    }

    fn is_recording(&self) -> bool {
        self.ended() == 0
    }
}

#[derive(Default)]
struct TracerLog {
    starts: Vec<RecordedStart>,
    spans: Vec<Arc<RecordingSpan>>,
    contexts: Vec<Context>,
}

/// Backend tracer that keeps every start and span it hands out.
#[derive(Clone, Default)]
pub struct RecordingTracer(Arc<Mutex<TracerLog>>);

impl RecordingTracer {
    pub fn starts(&self) -> Vec<RecordedStart> {
        self.0.lock().unwrap().starts.clone()
    }

    pub fn spans(&self) -> Vec<Arc<RecordingSpan>> {
        self.0.lock().unwrap().spans.clone()
    }

    /// Contexts returned from `start`, in order.
    pub fn contexts(&self) -> Vec<Context> {
        self.0.lock().unwrap().contexts.clone()
    }
}

impl Tracer for RecordingTracer {
    fn start(
        &self,
        ctx: Context,
        name: &str,
        options: Vec<SpanStartOption>,
    ) -> (Context, Arc<dyn Span>) {
        let span = Arc::new(RecordingSpan {
            name: name.to_string(),
            record: Mutex::new(SpanRecord::default()),
        });
        let mut log = self.0.lock().unwrap();
        log.starts.push(RecordedStart {
            name: name.to_string(),
            options,
            correlation_id: correlation_id(&ctx).map(|id| id.to_string()),
        });
        log.spans.push(Arc::clone(&span));

        let span: Arc<dyn Span> = span;
        let ctx = context_with_span(&ctx, Arc::clone(&span));
        log.contexts.push(ctx.clone());
        (ctx, span)
    }
}

// --- Facilities ---

#[derive(Debug, Clone, PartialEq)]
pub enum FacilityCall {
    Transport,
    Start { name: String },
    End {
        status_code: u16,
        error: Option<String>,
        /// Marker of the facility whose `start_span` produced the context.
        marker: Option<String>,
    },
}

struct Marker(String);

/// Facility recording each call; marks the contexts it starts.
#[derive(Clone)]
pub struct RecordingFacility {
    marker: String,
    calls: Arc<Mutex<Vec<FacilityCall>>>,
}

impl RecordingFacility {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<FacilityCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Facility for RecordingFacility {
    fn new_transport(&self, base: Transport) -> Transport {
        self.calls.lock().unwrap().push(FacilityCall::Transport);
        base
    }

    fn start_span(&self, ctx: Context, name: &str) -> Context {
        self.calls.lock().unwrap().push(FacilityCall::Start { name: name.to_string() });
        ctx.with_value(Marker(self.marker.clone()))
    }

    fn end_span(&self, ctx: &Context, status_code: u16, err: Option<&(dyn Error + 'static)>) {
        self.calls.lock().unwrap().push(FacilityCall::End {
            status_code,
            error: err.map(ToString::to_string),
            marker: ctx.get::<Marker>().map(|m| m.0.clone()),
        });
    }
}

/// Facility that only counts calls.
#[derive(Clone, Default)]
pub struct CountingFacility {
    pub calls: Arc<AtomicUsize>,
}

impl Facility for CountingFacility {
    fn new_transport(&self, base: Transport) -> Transport {
        self.calls.fetch_add(1, Ordering::Relaxed);
        base
    }

    fn start_span(&self, ctx: Context, _name: &str) -> Context {
        self.calls.fetch_add(1, Ordering::Relaxed);
        ctx
    }

    fn end_span(&self, _ctx: &Context, _status_code: u16, _err: Option<&(dyn Error + 'static)>) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

// --- Transports ---

/// Responds 200 and echoes the correlation header back.
pub fn echo_transport() -> Transport {
    boxed(service_fn(|request: Request<Body>| async move {
        let mut response = Response::builder().status(200);
        if let Some(value) = request.headers().get(CORRELATION_ID_KEY) {
            response = response.header(CORRELATION_ID_KEY, value.clone());
        }
        response.body(Body::empty())
    }))
}

#[derive(Debug)]
pub struct ConnectionRefused;

impl fmt::Display for ConnectionRefused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection refused")
    }
}

impl Error for ConnectionRefused {}

/// Fails every request.
pub fn failing_transport() -> Transport {
    boxed(service_fn(|_request: Request<Body>| async move {
        Err::<Response<Body>, _>(ConnectionRefused)
    }))
}
