use crate::cloud::LEVEL_CRITICAL;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::{Record, Source};
use crate::value::Attr;
use chrono::Utc;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::field::{Field, Visit};
use tracing::span;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Boolean event field that promotes an event to [`LEVEL_CRITICAL`].
pub const CRITICAL_FIELD: &str = "critical";

/// `tracing_subscriber` layer that turns events into [`Record`]s and passes
/// them to a [`Handler`] on the emitting thread.
///
/// Fields of enclosing spans are added to every event recorded inside them,
/// outermost span first, ahead of the event's own fields. A request span
/// carrying `trace-id` therefore tags each of its events.
pub struct CloudLoggingLayer<H> {
    handler: H,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events whose handler returned an error.
    pub failed_events: Arc<AtomicU64>,
}

impl<H: Handler> CloudLoggingLayer<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            total_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanAttrs(Vec<Attr>);

impl SpanAttrs {
    /// A recorded field replaces an earlier value under the same key, so
    /// every layer sharing the span can apply the same record.
    fn merge(&mut self, attrs: Vec<Attr>) {
        for attr in attrs {
            match self.0.iter_mut().find(|existing| existing.key == attr.key) {
                Some(existing) => *existing = attr,
                None => self.0.push(attr),
            }
        }
    }
}

impl<S, H> Layer<S> for CloudLoggingLayer<H>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    H: Handler + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        // Another CloudLoggingLayer on the same registry already captured
        // these fields.
        if extensions.get_mut::<SpanAttrs>().is_some() {
            return;
        }
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        extensions.insert(SpanAttrs(visitor.into_attrs()));
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanAttrs>() {
            Some(existing) => existing.merge(visitor.into_attrs()),
            None => extensions.insert(SpanAttrs(visitor.into_attrs())),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        let level = if visitor.critical {
            LEVEL_CRITICAL
        } else {
            Level::from(*meta.level())
        };
        if !self.handler.enabled(level) {
            return;
        }

        let mut attrs = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanAttrs>() {
                    attrs.extend(fields.0.iter().cloned());
                }
            }
        }
        attrs.extend(visitor.attrs);

        let record = Record {
            time: Some(Utc::now()),
            level,
            message: visitor.message.unwrap_or_default(),
            source: Source::from_metadata(meta),
            attrs,
        };

        if self.handler.handle(&record).is_err() {
            self.failed_events.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Collects `tracing` fields into [`Attr`]s.
#[derive(Default)]
struct FieldVisitor {
    attrs: Vec<Attr>,
    message: Option<String>,
    critical: bool,
}

impl FieldVisitor {
    fn into_attrs(self) -> Vec<Attr> {
        self.attrs
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.attrs.push(Attr::new(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.attrs.push(Attr::new(field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.attrs.push(Attr::new(field.name(), value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.attrs.push(Attr::new(field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == CRITICAL_FIELD {
            self.critical = value;
        } else {
            self.attrs.push(Attr::new(field.name(), value));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.attrs.push(Attr::new(field.name(), value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.attrs.push(Attr::new(field.name(), format!("{:?}", value)));
        }
    }
}

/// Emit an event at Cloud Logging's `CRITICAL` severity.
///
/// Accepts the same arguments as [`tracing::error!`], without a `target:` or
/// `parent:` prefix.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        ::tracing::error!(critical = true, $($arg)+)
    };
}
