use crate::handle::SinkHandle;
use crate::record::{ErrorDetail, Level, LogRecord};
use chrono::Utc;
use std::fmt::Write as _;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// submits them to a running sink.
///
/// The event target becomes the record category, so per-category levels
/// apply to module paths (`my_app::payments`). A field named `error` is
/// lifted into the record's error block; other fields are appended to the
/// message as `key=value`.
pub struct FileLogLayer {
    handle: SinkHandle,
}

impl FileLogLayer {
    pub fn new(handle: SinkHandle) -> Self {
        Self { handle }
    }
}

impl<S> Layer<S> for FileLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(meta.level());
        if !self.handle.admit(meta.target(), level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            category: meta.target().to_string(),
            message: visitor.render_message(),
            error: visitor.error.map(ErrorDetail::new),
        };
        self.handle.enqueue(record);
    }
}

/// Collects the `message`, an optional `error` and the remaining fields of
/// an event.
#[derive(Default)]
pub struct FieldVisitor {
    pub message: Option<String>,
    pub error: Option<String>,
    pub fields: Vec<(&'static str, String)>,
}

impl FieldVisitor {
    /// Message followed by ` key=value` pairs in recording order.
    pub fn render_message(&self) -> String {
        let mut out = self.message.clone().unwrap_or_default();
        for (name, value) in &self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{}={}", name, value);
        }
        out
    }

    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "error" => self.error = Some(value),
            name => self.fields.push((name, value)),
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let detail = ErrorDetail::from_error(value);
        self.put(field, detail.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }
}
