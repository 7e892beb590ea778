/*!
 * Document model for vault notes.
 *
 * A note is an optional YAML front-matter block delimited by `---` lines,
 * followed by the Markdown body. Front matter is held as a typed mapping so
 * the engine can add its translation record, while the exact source text of
 * an untouched block is kept for byte-for-byte round trips.
 */

use indexmap::IndexMap;
use log::debug;
use serde_yaml::{Mapping, Value};

/// Front-matter delimiter line
pub const FRONT_MATTER_MARKER: &str = "---";

/// A front-matter value.
///
/// Shapes the pipeline reads or writes get their own variant; anything else
/// is carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
    Map(IndexMap<String, MetaValue>),
    /// Nulls, mixed sequences, tagged values, non-string keys
    Passthrough(Value),
}

impl From<&Value> for MetaValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s.clone()),
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Passthrough(value.clone())
                }
            }
            Value::Sequence(items) => {
                let strings: Option<Vec<String>> = items.iter().map(|v| v.as_str().map(str::to_string)).collect();
                match strings {
                    Some(list) => Self::List(list),
                    None => Self::Passthrough(value.clone()),
                }
            }
            Value::Mapping(mapping) => match mapping_to_entries(mapping) {
                Some(entries) => Self::Map(entries),
                None => Self::Passthrough(value.clone()),
            },
            _ => Self::Passthrough(value.clone()),
        }
    }
}

impl MetaValue {
    /// Convert back to a YAML value for serialisation
    pub fn to_yaml(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::Number((*i).into()),
            Self::Float(f) => Value::Number((*f).into()),
            Self::Bool(b) => Value::Bool(*b),
            Self::List(items) => Value::Sequence(items.iter().cloned().map(Value::String).collect()),
            Self::Map(entries) => Value::Mapping(entries_to_mapping(entries)),
            Self::Passthrough(value) => value.clone(),
        }
    }

    /// String content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Nested entries, if this is a map value
    pub fn as_map(&self) -> Option<&IndexMap<String, MetaValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

fn mapping_to_entries(mapping: &Mapping) -> Option<IndexMap<String, MetaValue>> {
    mapping
        .iter()
        .map(|(k, v)| k.as_str().map(|key| (key.to_string(), MetaValue::from(v))))
        .collect()
}

fn entries_to_mapping(entries: &IndexMap<String, MetaValue>) -> Mapping {
    entries
        .iter()
        .map(|(k, v)| (Value::String(k.clone()), v.to_yaml()))
        .collect()
}

/// Front-matter mapping plus the source block it was read from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    entries: IndexMap<String, MetaValue>,
    /// Exact block text including both delimiter lines; cleared on mutation
    source: Option<String>,
    /// Block did not parse as a mapping; only `source` is meaningful
    opaque: bool,
}

impl FrontMatter {
    /// Empty mapping with no source block
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &IndexMap<String, MetaValue> {
        &self.entries
    }

    /// Insert or overwrite a key. The block will be re-serialised on compose.
    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) -> Option<MetaValue> {
        self.source = None;
        self.entries.insert(key.into(), value)
    }

    /// True when compose will reproduce the block read from disk verbatim
    pub fn is_pristine(&self) -> bool {
        self.source.is_some()
    }

    /// True when a delimited block was found but is not a YAML mapping.
    /// Such a block is written back verbatim and must not be edited.
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    fn render(&self) -> String {
        if let Some(source) = &self.source {
            return source.clone();
        }
        if self.entries.is_empty() {
            return String::new();
        }
        let yaml = serde_yaml::to_string(&Value::Mapping(entries_to_mapping(&self.entries))).unwrap_or_default();
        format!("{marker}\n{}\n{marker}\n", yaml.trim_end_matches('\n'), marker = FRONT_MATTER_MARKER)
    }
}

impl FromIterator<(String, MetaValue)> for FrontMatter {
    fn from_iter<T: IntoIterator<Item = (String, MetaValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            source: None,
            opaque: false,
        }
    }
}

/// A note split into front matter and body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub front_matter: FrontMatter,
    pub body: String,
}

impl Document {
    /// Parse raw file content
    pub fn parse(raw: &str) -> Self {
        let (front_matter, body) = extract_front_matter(raw);
        Self { front_matter, body }
    }

    /// Serialise to on-disk form
    pub fn compose(&self) -> String {
        compose(&self.front_matter, &self.body)
    }

    /// Copy of this document with a different body
    pub fn with_body(&self, body: impl Into<String>) -> Self {
        Self {
            front_matter: self.front_matter.clone(),
            body: body.into(),
        }
    }
}

/// Split raw content into front matter and body.
///
/// The block must start on the first line and be closed by a marker line.
/// A closed block that is not a YAML mapping is kept as an opaque block.
pub fn extract_front_matter(raw: &str) -> (FrontMatter, String) {
    let Some((block_end, yaml)) = locate_block(raw) else {
        return (FrontMatter::new(), raw.to_string());
    };

    let entries = if yaml.trim().is_empty() {
        Some(IndexMap::new())
    } else {
        match serde_yaml::from_str::<Value>(yaml) {
            Ok(Value::Mapping(mapping)) => mapping_to_entries(&mapping),
            Ok(Value::Null) => Some(IndexMap::new()),
            Ok(_) => None,
            Err(e) => {
                debug!("Keeping unparseable front matter verbatim: {}", e);
                None
            }
        }
    };

    let front_matter = FrontMatter {
        opaque: entries.is_none(),
        entries: entries.unwrap_or_default(),
        source: Some(raw[..block_end].to_string()),
    };
    (front_matter, raw[block_end..].to_string())
}

/// Serialise front matter followed by the body
pub fn compose(front_matter: &FrontMatter, body: &str) -> String {
    let mut raw = front_matter.render();
    raw.push_str(body);
    raw
}

/// Find the front-matter block. Returns the byte offset where the body starts
/// and the YAML text between the markers.
fn locate_block(raw: &str) -> Option<(usize, &str)> {
    let first_line_end = raw.find('\n')?;
    if raw[..first_line_end].trim_end_matches('\r') != FRONT_MATTER_MARKER {
        return None;
    }

    let yaml_start = first_line_end + 1;
    let mut line_start = yaml_start;
    while line_start <= raw.len() {
        let line_end = raw[line_start..].find('\n').map(|i| line_start + i);
        let line = &raw[line_start..line_end.unwrap_or(raw.len())];
        if line.trim_end_matches('\r') == FRONT_MATTER_MARKER {
            let body_start = line_end.map(|i| i + 1).unwrap_or(raw.len());
            return Some((body_start, &raw[yaml_start..line_start]));
        }
        match line_end {
            Some(end) => line_start = end + 1,
            None => break,
        }
    }
    None
}
