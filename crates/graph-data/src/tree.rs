//! The primitive value tree every converter reads and writes against.
//!
//! A [`Section`] owns its children exclusively. Shared objects are expressed
//! with marker strings, never by aliasing parts of the tree.

use std::fmt;

use indexmap::IndexMap;

use crate::error::DataError;

/// Variant tag of a stored [`PrimitiveValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    Text,
    Section,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Section => "section",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Section(Section),
}

impl PrimitiveValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PrimitiveValue::Null => ValueKind::Null,
            PrimitiveValue::Bool(_) => ValueKind::Bool,
            PrimitiveValue::Integer(_) => ValueKind::Integer,
            PrimitiveValue::Float(_) => ValueKind::Float,
            PrimitiveValue::Text(_) => ValueKind::Text,
            PrimitiveValue::Section(_) => ValueKind::Section,
        }
    }
}

impl From<bool> for PrimitiveValue {
    fn from(value: bool) -> Self {
        PrimitiveValue::Bool(value)
    }
}

impl From<i64> for PrimitiveValue {
    fn from(value: i64) -> Self {
        PrimitiveValue::Integer(value)
    }
}

impl From<i32> for PrimitiveValue {
    fn from(value: i32) -> Self {
        PrimitiveValue::Integer(i64::from(value))
    }
}

impl From<f64> for PrimitiveValue {
    fn from(value: f64) -> Self {
        PrimitiveValue::Float(value)
    }
}

impl From<f32> for PrimitiveValue {
    fn from(value: f32) -> Self {
        PrimitiveValue::Float(f64::from(value))
    }
}

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        PrimitiveValue::Text(value)
    }
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::Text(value.to_owned())
    }
}

impl From<Section> for PrimitiveValue {
    fn from(value: Section) -> Self {
        PrimitiveValue::Section(value)
    }
}

/// Turns `slot` into an empty section unless it already holds one.
fn section_slot(slot: &mut PrimitiveValue) -> &mut Section {
    match slot {
        PrimitiveValue::Section(section) => section,
        other => {
            *other = PrimitiveValue::Section(Section::new());
            section_slot(other)
        }
    }
}

/// A nested scope of the tree: string keys mapped to primitive values.
///
/// Insertion order is kept so dumps and encoded output stay readable, but no
/// caller may rely on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    entries: IndexMap<String, PrimitiveValue>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PrimitiveValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn set_null(&mut self, key: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), PrimitiveValue::Null);
        self
    }

    /// Stores `value` under `key` and hands back whatever was there before.
    pub fn insert(&mut self, key: impl Into<String>, value: PrimitiveValue) -> Option<PrimitiveValue> {
        self.entries.insert(key.into(), value)
    }

    /// Replaces `key` with a fresh empty section and returns it.
    pub fn create_section(&mut self, key: impl Into<String>) -> &mut Section {
        let slot = self.entries.entry(key.into()).or_insert(PrimitiveValue::Null);
        *slot = PrimitiveValue::Section(Section::new());
        section_slot(slot)
    }

    pub fn delete(&mut self, key: &str) -> Option<PrimitiveValue> {
        self.entries.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&PrimitiveValue> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PrimitiveValue> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrimitiveValue)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variant stored at `key`, or `None` when absent.
    pub fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.entries.get(key).map(PrimitiveValue::kind)
    }

    fn lookup(&self, key: &str) -> Result<&PrimitiveValue, DataError> {
        self.entries.get(key).ok_or_else(|| DataError::missing(key))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, DataError> {
        match self.lookup(key)? {
            PrimitiveValue::Bool(value) => Ok(*value),
            other => Err(DataError::wrong_type(key, "bool", other.kind().as_str())),
        }
    }

    pub fn get_integer(&self, key: &str) -> Result<i64, DataError> {
        match self.lookup(key)? {
            PrimitiveValue::Integer(value) => Ok(*value),
            other => Err(DataError::wrong_type(key, "integer", other.kind().as_str())),
        }
    }

    /// Reads a float; a stored integer widens, the reverse never happens.
    pub fn get_float(&self, key: &str) -> Result<f64, DataError> {
        match self.lookup(key)? {
            PrimitiveValue::Float(value) => Ok(*value),
            PrimitiveValue::Integer(value) => Ok(*value as f64),
            other => Err(DataError::wrong_type(key, "float", other.kind().as_str())),
        }
    }

    pub fn get_text(&self, key: &str) -> Result<&str, DataError> {
        match self.lookup(key)? {
            PrimitiveValue::Text(value) => Ok(value),
            other => Err(DataError::wrong_type(key, "text", other.kind().as_str())),
        }
    }

    pub fn get_section(&self, key: &str) -> Result<&Section, DataError> {
        match self.lookup(key)? {
            PrimitiveValue::Section(section) => Ok(section),
            other => Err(DataError::wrong_type(key, "section", other.kind().as_str())),
        }
    }

    pub fn get_section_mut(&mut self, key: &str) -> Result<&mut Section, DataError> {
        match self.entries.get_mut(key) {
            Some(PrimitiveValue::Section(section)) => Ok(section),
            Some(other) => Err(DataError::wrong_type(key, "section", other.kind().as_str())),
            None => Err(DataError::missing(key)),
        }
    }

    /// Follows `path` through nested sections.
    pub fn section_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&Section> {
        let mut current = self;
        for key in path {
            match current.entries.get(key.as_ref()) {
                Some(PrimitiveValue::Section(section)) => current = section,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn section_at_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Section> {
        let mut current = self;
        for key in path {
            match current.entries.get_mut(key.as_ref()) {
                Some(PrimitiveValue::Section(section)) => current = section,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Deep structural copy, fully independent of `self`.
    pub fn copy(&self) -> Section {
        self.clone()
    }

    fn dump(&self, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{\n")?;
        for (key, value) in &self.entries {
            indent(depth + 1, f)?;
            write!(f, "{key}: ")?;
            match value {
                PrimitiveValue::Section(section) => section.dump(depth + 1, f)?,
                PrimitiveValue::Null => f.write_str("null")?,
                PrimitiveValue::Bool(v) => write!(f, "{v}")?,
                PrimitiveValue::Integer(v) => write!(f, "{v}")?,
                PrimitiveValue::Float(v) => write!(f, "{v:?}")?,
                PrimitiveValue::Text(v) => f.write_str(v)?,
            }
            f.write_str(",\n")?;
        }
        indent(depth, f)?;
        f.write_str("}")
    }
}

fn indent(depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("  ")?;
    }
    Ok(())
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(0, f)
    }
}
