use crate::error::HandlerError;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::Record;
use crate::value::{Attr, Value};
use serde_json::Map;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Key of the built-in record timestamp.
pub const TIME_KEY: &str = "time";
/// Key of the built-in record level.
pub const LEVEL_KEY: &str = "level";
/// Key of the built-in record message.
pub const MESSAGE_KEY: &str = "msg";
/// Key of the built-in caller location.
pub const SOURCE_KEY: &str = "source";

/// Hook applied to every non-group attribute before it is encoded.
///
/// The first argument is the path of open groups, outermost first; it is
/// empty for the built-in attributes.
pub type ReplaceAttr = dyn Fn(&[String], Attr) -> Attr + Send + Sync;

#[derive(Clone)]
pub struct HandlerOptions {
    /// Emit the record's caller location under [`SOURCE_KEY`].
    pub add_source: bool,
    /// Records below this level are not handled.
    pub level: Level,
    pub replace_attr: Option<Arc<ReplaceAttr>>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            add_source: false,
            level: Level::INFO,
            replace_attr: None,
        }
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("add_source", &self.add_source)
            .field("level", &self.level)
            .field("replace_attr", &self.replace_attr.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
enum Derivation {
    Attrs(Vec<Attr>),
    Group(String),
}

/// [`Handler`] that writes each record as one line of JSON.
///
/// Derived handlers share the writer and options of their parent and only
/// extend the chain of attributes and groups applied at handle time.
pub struct JsonHandler<W> {
    make_writer: Arc<W>,
    options: Arc<HandlerOptions>,
    chain: Vec<Derivation>,
}

impl<W> Clone for JsonHandler<W> {
    fn clone(&self) -> Self {
        Self {
            make_writer: Arc::clone(&self.make_writer),
            options: Arc::clone(&self.options),
            chain: self.chain.clone(),
        }
    }
}

impl<W> fmt::Debug for JsonHandler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonHandler")
            .field("options", &self.options)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl<W> JsonHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    pub fn new(make_writer: W, options: HandlerOptions) -> Self {
        Self {
            make_writer: Arc::new(make_writer),
            options: Arc::new(options),
            chain: Vec::new(),
        }
    }

    fn replace(&self, groups: &[String], attr: Attr) -> Attr {
        match &self.options.replace_attr {
            Some(replace) => replace(groups, attr),
            None => attr,
        }
    }

    fn append(
        &self,
        map: &mut Map<String, serde_json::Value>,
        groups: &mut Vec<String>,
        attr: Attr,
    ) {
        let Attr { key, value } = attr;
        match value {
            Value::Group(members) if key.is_empty() => {
                for member in members {
                    self.append(map, groups, member);
                }
            }
            Value::Group(members) => {
                groups.push(key);
                let mut inner = Map::new();
                for member in members {
                    self.append(&mut inner, groups, member);
                }
                let key = groups.pop().unwrap_or_default();
                if !inner.is_empty() {
                    merge_object(map, key, inner);
                }
            }
            value => {
                let attr = self.replace(groups, Attr { key, value });
                if !attr.key.is_empty() {
                    map.insert(attr.key, attr.value.to_json());
                }
            }
        }
    }

    /// Apply the derivation chain, then the record's own attributes, which
    /// land in the innermost open group.
    fn fill(
        &self,
        map: &mut Map<String, serde_json::Value>,
        chain: &[Derivation],
        groups: &mut Vec<String>,
        record: &Record,
    ) {
        match chain.split_first() {
            None => {
                for attr in &record.attrs {
                    self.append(map, groups, attr.clone());
                }
            }
            Some((Derivation::Attrs(attrs), rest)) => {
                for attr in attrs {
                    self.append(map, groups, attr.clone());
                }
                self.fill(map, rest, groups, record);
            }
            Some((Derivation::Group(name), rest)) => {
                groups.push(name.clone());
                let mut inner = Map::new();
                self.fill(&mut inner, rest, groups, record);
                groups.pop();
                if !inner.is_empty() {
                    merge_object(map, name.clone(), inner);
                }
            }
        }
    }

    /// Encode `record` as a JSON object, without the trailing newline.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, HandlerError> {
        let mut map = Map::new();
        let mut groups = Vec::new();

        if let Some(time) = record.time {
            self.append(&mut map, &mut groups, Attr::new(TIME_KEY, time));
        }
        self.append(&mut map, &mut groups, Attr::new(LEVEL_KEY, record.level));
        if self.options.add_source {
            if let Some(source) = &record.source {
                self.append(&mut map, &mut groups, Attr::new(SOURCE_KEY, source.clone()));
            }
        }
        self.append(&mut map, &mut groups, Attr::new(MESSAGE_KEY, record.message.as_str()));
        self.fill(&mut map, &self.chain, &mut groups, record);

        Ok(serde_json::to_vec(&serde_json::Value::Object(map))?)
    }
}

/// Store `inner` under `key`, folding it into an object already there so a
/// group opened twice keeps the members of both.
fn merge_object(
    map: &mut Map<String, serde_json::Value>,
    key: String,
    inner: Map<String, serde_json::Value>,
) {
    match map.get_mut(&key) {
        Some(serde_json::Value::Object(existing)) => {
            for (member, value) in inner {
                match value {
                    serde_json::Value::Object(nested) => merge_object(existing, member, nested),
                    value => {
                        existing.insert(member, value);
                    }
                }
            }
        }
        _ => {
            map.insert(key, serde_json::Value::Object(inner));
        }
    }
}

impl<W> Handler for JsonHandler<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn enabled(&self, level: Level) -> bool {
        level >= self.options.level
    }

    fn handle(&self, record: &Record) -> Result<(), HandlerError> {
        let mut line = self.encode(record)?;
        line.push(b'\n');
        // One write per record so concurrent records never interleave.
        let mut writer = self.make_writer.make_writer();
        writer.write_all(&line)?;
        Ok(())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        let mut derived = self.clone();
        if !attrs.is_empty() {
            derived.chain.push(Derivation::Attrs(attrs));
        }
        derived
    }

    fn with_group(&self, name: &str) -> Self {
        let mut derived = self.clone();
        if !name.is_empty() {
            derived.chain.push(Derivation::Group(name.to_string()));
        }
        derived
    }
}
