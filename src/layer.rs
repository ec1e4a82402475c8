use crate::client::WeakLogmonitor;
use crate::record::{LogLevel, LogValue};
use std::collections::BTreeMap;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Targets whose events are never captured: the client's own diagnostics
/// and the HTTP stack it delivers through.
const IGNORED_TARGETS: &[&str] = &["logmonitor", "reqwest", "hyper", "h2", "rustls"];

/// `tracing_subscriber` layer that mirrors events into a
/// [`Logmonitor`](crate::client::Logmonitor).
///
/// Other layers in the stack (for example `fmt`) are not affected: this
/// layer only observes. The event's `message` becomes the first argument,
/// remaining fields are passed as one map argument.
pub struct CaptureLayer {
    client: WeakLogmonitor,
}

impl CaptureLayer {
    pub fn new(client: WeakLogmonitor) -> Self {
        Self { client }
    }
}

fn is_ignored(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|prefix| {
        target == *prefix
            || target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_ignored(meta.target()) {
            return;
        }
        let Some(client) = self.client.upgrade() else {
            return;
        };
        if !client.is_active() {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let mut args = Vec::with_capacity(2);
        if let Some(message) = message {
            args.push(LogValue::Str(message));
        }
        if !fields.is_empty() {
            args.push(LogValue::Map(fields));
        }

        client.record(LogLevel::from(meta.level()), args);
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, LogValue>,
    pub message: &'a mut Option<String>,
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), LogValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), LogValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), LogValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), LogValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), LogValue::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields
            .insert(field.name().to_string(), LogValue::Opaque(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields
                .insert(field.name().to_string(), LogValue::opaque(value));
        }
    }
}
