use crate::level::Level;
use crate::record::Source;
use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Value carried by an [`Attr`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Level(Level),
    Time(DateTime<Utc>),
    Duration(Duration),
    Source(Source),
    Group(Vec<Attr>),
}

/// A key/value pair attached to a record or handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Attr { key: key.into(), value: value.into() }
    }

    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Attr { key: key.into(), value: Value::Group(attrs) }
    }
}

impl Value {
    /// JSON encoding of a scalar value.
    ///
    /// Groups are flattened into objects by the JSON handler itself, which
    /// also applies attribute rewriting to their members; this method only
    /// sees groups that bypass that path.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::I64(n) => serde_json::Value::from(*n),
            Value::U64(n) => serde_json::Value::from(*n),
            // `From<f64>` maps NaN and infinities to null.
            Value::F64(n) => serde_json::Value::from(*n),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Level(level) => serde_json::Value::String(level.to_string()),
            Value::Time(t) => {
                serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Duration(d) => {
                serde_json::Value::from(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            }
            Value::Source(source) => serde_json::to_value(source).unwrap_or_default(),
            Value::Group(attrs) => serde_json::Value::Object(
                attrs
                    .iter()
                    .map(|attr| (attr.key.clone(), attr.value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I64(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Level> for Value {
    fn from(v: Level) -> Self {
        Value::Level(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<Source> for Value {
    fn from(v: Source) -> Self {
        Value::Source(v)
    }
}
