use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};
use tracing::{Id, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Fields copied from a parent span into its children unless overridden.
const PROPAGATED_FIELDS: [&str; 2] = ["session.id", "session_id"];

/// A closed span as recorded by [`CaptureLayer`].
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    #[serde(rename = "span_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "parent_span_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Wall-clock start, nanoseconds since the Unix epoch.
    pub start_time: u128,
    pub end_time: u128,
    #[serde(rename = "duration_us")]
    #[serde(serialize_with = "serialize_micros")]
    pub duration: Duration,

    /// Position of this span's creation among all captured span events.
    pub opened_seq: u64,
    /// Position of this span's close among all captured span events.
    pub closed_seq: u64,

    pub attributes: HashMap<String, serde_json::Value>,
}

impl SpanRecord {
    /// The session this span belongs to, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.attributes
            .get("session.id")
            .or_else(|| self.attributes.get("session_id"))
            .and_then(|v| v.as_str())
    }
}

fn serialize_micros<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_micros())
}

/// Shared storage for captured spans, in close order.
#[derive(Debug, Clone, Default)]
pub struct SpanCapture {
    spans: Arc<RwLock<Vec<SpanRecord>>>,
    seq: Arc<AtomicU64>,
}

impl SpanCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer that records into this capture.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer { capture: self.clone() }
    }

    /// Every captured span, in the order the spans closed.
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Spans named `name`, in close order.
    pub fn named(&self, name: &str) -> Vec<SpanRecord> {
        self.spans().into_iter().filter(|s| s.name == name).collect()
    }

    /// Spans recorded under `session_id`, directly or through a parent span.
    pub fn session(&self, session_id: &str) -> Vec<SpanRecord> {
        self.spans().into_iter().filter(|s| s.session_id() == Some(session_id)).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut spans) = self.spans.write() {
            spans.clear();
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn push(&self, span: SpanRecord) {
        if let Ok(mut spans) = self.spans.write() {
            spans.push(span);
        }
    }
}

/// A tracing layer that keeps closed spans in a [`SpanCapture`].
pub struct CaptureLayer {
    capture: SpanCapture,
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

#[derive(Clone, Copy)]
struct Opened {
    wall: u128,
    instant: Instant,
    seq: u64,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        if let Some(parent) = span.parent() {
            if let Some(parent_fields) = parent.extensions().get::<SpanFields>() {
                for key in PROPAGATED_FIELDS {
                    if !fields.contains_key(key) {
                        if let Some(value) = parent_fields.0.get(key) {
                            fields.insert(key.to_string(), value.clone());
                        }
                    }
                }
            }
        }

        let mut extensions = span.extensions_mut();
        extensions.insert(Opened {
            wall: unix_nanos(),
            instant: Instant::now(),
            seq: self.capture.next_seq(),
        });
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let extensions = span.extensions();
        let Some(opened) = extensions.get::<Opened>().copied() else { return };
        let attributes = extensions.get::<SpanFields>().map(|f| f.0.clone()).unwrap_or_default();

        self.capture.push(SpanRecord {
            id: format!("{:016x}", id.into_u64()),
            name: span.metadata().name().to_string(),
            parent_id: span.parent().map(|p| format!("{:016x}", p.id().into_u64())),
            start_time: opened.wall,
            end_time: unix_nanos(),
            duration: opened.instant.elapsed(),
            opened_seq: opened.seq,
            closed_seq: self.capture.next_seq(),
            attributes,
        });
    }
}

fn unix_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
