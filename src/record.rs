use crate::level::Level;
use crate::value::Attr;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Single log event as seen by a [`Handler`](crate::handler::Handler).
///
/// Handlers receive records by reference and never modify them; any derived
/// attributes are merged into the serialized output only.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Omitted from the output when `None`.
    pub time: Option<DateTime<Utc>>,
    pub level: Level,
    pub message: String,
    pub source: Option<Source>,
    pub attrs: Vec<Attr>,
}

impl Record {
    pub fn new(time: Option<DateTime<Utc>>, level: Level, message: impl Into<String>) -> Self {
        Record {
            time,
            level,
            message: message.into(),
            source: None,
            attrs: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn add_attrs(&mut self, attrs: impl IntoIterator<Item = Attr>) {
        self.attrs.extend(attrs);
    }
}

/// Caller location of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Source {
    /// Location of a `tracing` callsite. Returns `None` when the metadata
    /// carries no file and no line.
    pub fn from_metadata(meta: &tracing::Metadata<'_>) -> Option<Self> {
        if meta.file().is_none() && meta.line().is_none() {
            return None;
        }
        Some(Source {
            function: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
        })
    }
}
