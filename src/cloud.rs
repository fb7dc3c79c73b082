//! Handler producing the special JSON fields recognised by the Cloud Logging
//! agent.
//!
//! See <https://cloud.google.com/logging/docs/structured-logging#special-payload-fields>.

use crate::error::HandlerError;
use crate::handler::Handler;
use crate::json::{self, HandlerOptions, JsonHandler};
use crate::level::Level;
use crate::record::Record;
use crate::value::{Attr, Value};
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Extra level supported by Cloud Logging, above [`Level::ERROR`].
pub const LEVEL_CRITICAL: Level = Level(12);

/// Attribute holding the bare trace id of the current request.
pub const TRACE_ID_KEY: &str = "trace-id";
/// Attribute holding the span id of the current request.
pub const SPAN_ID_KEY: &str = "span-id";

pub const CLOUD_MESSAGE_KEY: &str = "message";
pub const CLOUD_SEVERITY_KEY: &str = "severity";
pub const CLOUD_SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";
pub const CLOUD_TRACE_KEY: &str = "logging.googleapis.com/trace";
pub const CLOUD_SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";

/// Rename a single attribute to its Cloud Logging special field.
///
/// Only the message, source, level, `trace-id` and `span-id` keys are
/// touched; every other attribute is returned as is. Values of unexpected
/// type keep their value and only get the new key.
pub fn rewrite_attr(project_id: &str, mut attr: Attr) -> Attr {
    match attr.key.as_str() {
        json::MESSAGE_KEY => attr.key = CLOUD_MESSAGE_KEY.to_string(),
        json::SOURCE_KEY => attr.key = CLOUD_SOURCE_LOCATION_KEY.to_string(),
        json::LEVEL_KEY => {
            attr.key = CLOUD_SEVERITY_KEY.to_string();
            if attr.value == Value::Level(LEVEL_CRITICAL) {
                attr.value = Value::String("CRITICAL".to_string());
            }
        }
        TRACE_ID_KEY => {
            attr.key = CLOUD_TRACE_KEY.to_string();
            if let Value::String(trace_id) = &attr.value {
                attr.value = Value::String(format!("projects/{project_id}/traces/{trace_id}"));
            }
        }
        SPAN_ID_KEY => attr.key = CLOUD_SPAN_ID_KEY.to_string(),
        _ => {}
    }
    attr
}

/// [`Handler`] that outputs JSON understood by the Cloud Logging structured
/// log agent.
///
/// Records below `INFO` are dropped and the caller location is always
/// included. Attributes are rewritten with [`rewrite_attr`] as they are
/// encoded, including those added through [`Handler::with_attrs`].
pub struct CloudLoggingHandler<W = fn() -> io::Stderr> {
    project_id: Arc<str>,
    inner: JsonHandler<W>,
}

impl CloudLoggingHandler {
    /// Handler writing to the process's standard error. `project_id` is not
    /// validated.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self::with_writer(project_id, io::stderr as fn() -> io::Stderr)
    }
}

impl<W> CloudLoggingHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    pub fn with_writer(project_id: impl Into<String>, make_writer: W) -> Self {
        let project_id: Arc<str> = Arc::from(project_id.into());
        let captured = Arc::clone(&project_id);
        let options = HandlerOptions {
            add_source: true,
            level: Level::INFO,
            replace_attr: Some(Arc::new(move |_groups: &[String], attr: Attr| {
                rewrite_attr(&captured, attr)
            })),
        };
        Self {
            project_id,
            inner: JsonHandler::new(make_writer, options),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl<W> Clone for CloudLoggingHandler<W> {
    fn clone(&self) -> Self {
        Self {
            project_id: Arc::clone(&self.project_id),
            inner: self.inner.clone(),
        }
    }
}

impl<W> std::fmt::Debug for CloudLoggingHandler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudLoggingHandler")
            .field("project_id", &self.project_id)
            .field("inner", &self.inner)
            .finish()
    }
}

impl<W> Handler for CloudLoggingHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    fn handle(&self, record: &Record) -> Result<(), HandlerError> {
        self.inner.handle(record)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        Self {
            project_id: Arc::clone(&self.project_id),
            inner: self.inner.with_attrs(attrs),
        }
    }

    fn with_group(&self, name: &str) -> Self {
        Self {
            project_id: Arc::clone(&self.project_id),
            inner: self.inner.with_group(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Source;
    use crate::test_support::{Broken, Buffer};
    use serde_json::json;

    fn rewrite(attr: Attr) -> Attr {
        rewrite_attr("proj-1", attr)
    }

    #[test]
    fn renames_builtin_keys() {
        assert_eq!(rewrite(Attr::new("msg", "hi")), Attr::new("message", "hi"));
        assert_eq!(rewrite(Attr::new("level", Level::WARN)), Attr::new("severity", Level::WARN));
        let source = Source { function: None, file: Some("a.rs".into()), line: Some(1) };
        assert_eq!(
            rewrite(Attr::new("source", source.clone())),
            Attr::new(CLOUD_SOURCE_LOCATION_KEY, source)
        );
    }

    #[test]
    fn critical_level_becomes_literal() {
        assert_eq!(rewrite(Attr::new("level", LEVEL_CRITICAL)), Attr::new("severity", "CRITICAL"));
    }

    #[test]
    fn unexpected_level_value_passes_through() {
        assert_eq!(rewrite(Attr::new("level", 12i64)), Attr::new("severity", 12i64));
    }

    #[test]
    fn trace_id_becomes_resource_path() {
        assert_eq!(
            rewrite(Attr::new("trace-id", "abc123")),
            Attr::new(CLOUD_TRACE_KEY, "projects/proj-1/traces/abc123")
        );
        assert_eq!(rewrite(Attr::new("trace-id", 7u64)), Attr::new(CLOUD_TRACE_KEY, 7u64));
        assert_eq!(
            rewrite_attr("", Attr::new("trace-id", "t")),
            Attr::new(CLOUD_TRACE_KEY, "projects//traces/t")
        );
    }

    #[test]
    fn span_id_renamed_and_others_untouched() {
        assert_eq!(rewrite(Attr::new("span-id", "42")), Attr::new(CLOUD_SPAN_ID_KEY, "42"));
        assert_eq!(rewrite(Attr::new("user", "bob")), Attr::new("user", "bob"));
        assert_eq!(rewrite(Attr::new("trace_id", "x")), Attr::new("trace_id", "x"));
    }

    #[test]
    fn rewrite_is_idempotent_on_output_keys() {
        let once = rewrite(Attr::new("trace-id", "abc"));
        assert_eq!(rewrite(once.clone()), once);
    }

    #[test]
    fn handles_record_in_cloud_schema() {
        let buffer = Buffer::default();
        let handler = CloudLoggingHandler::with_writer("proj-1", buffer.clone());
        let source = Source {
            function: Some("svc".into()),
            file: Some("src/svc.rs".into()),
            line: Some(10),
        };
        let mut record = Record::new(None, Level::INFO, "hello").with_source(source);
        record.add_attrs([
            Attr::new("trace-id", "abc123"),
            Attr::new("span-id", "7"),
            Attr::new("user", "bob"),
        ]);

        handler.handle(&record).unwrap();

        assert_eq!(
            buffer.lines()[0],
            json!({
                "severity": "INFO",
                "logging.googleapis.com/sourceLocation": {
                    "function": "svc",
                    "file": "src/svc.rs",
                    "line": 10,
                },
                "message": "hello",
                "logging.googleapis.com/trace": "projects/proj-1/traces/abc123",
                "logging.googleapis.com/spanId": "7",
                "user": "bob",
            })
        );
    }

    #[test]
    fn enabled_from_info_upwards() {
        let handler = CloudLoggingHandler::with_writer("p", Buffer::default());
        assert!(!handler.enabled(Level::DEBUG));
        assert!(!handler.enabled(Level(-8)));
        assert!(handler.enabled(Level::INFO));
        assert!(handler.enabled(Level::ERROR));
        assert!(handler.enabled(LEVEL_CRITICAL));
    }

    #[test]
    fn derived_attrs_are_rewritten_and_parent_is_unchanged() {
        let buffer = Buffer::default();
        let parent = CloudLoggingHandler::with_writer("p", buffer.clone());
        let child = parent.with_attrs(vec![Attr::new("trace-id", "t1")]).with_group("req");
        let mut record = Record::new(None, LEVEL_CRITICAL, "boom");
        record.add_attrs([Attr::new("span-id", "s1")]);

        child.handle(&record).unwrap();
        parent.handle(&record).unwrap();

        let lines = buffer.lines();
        assert_eq!(
            lines[0],
            json!({
                "severity": "CRITICAL",
                "message": "boom",
                "logging.googleapis.com/trace": "projects/p/traces/t1",
                "req": {"logging.googleapis.com/spanId": "s1"},
            })
        );
        assert_eq!(
            lines[1],
            json!({
                "severity": "CRITICAL",
                "message": "boom",
                "logging.googleapis.com/spanId": "s1",
            })
        );
        assert_eq!(child.project_id(), "p");
    }

    #[test]
    fn write_errors_propagate() {
        let handler = CloudLoggingHandler::with_writer("p", Broken);
        assert!(matches!(
            handler.handle(&Record::new(None, Level::INFO, "m")),
            Err(HandlerError::Io(_))
        ));
    }
}
