//! JSON codec.
//!
//! Sections become JSON objects. Integers are written as JSON integers and
//! floats always carry a fraction or exponent, so each number decodes back
//! into the variant it was written from. JSON arrays have no tree
//! counterpart and are rejected.
//!
//! Decoding does not use the parser's fixed recursion limit. Nesting is
//! bounded by [`Limits::max_depth`] instead, so any tree an encoder with the
//! same limits produces can be read back.

use graph_data::{Limits, PrimitiveValue, Section};
use serde::Deserialize;
use serde_json::{Map, Number, Value};

use super::types::{CodecError, TreeCodec};

/// Object levels a document may add on top of the deepest section: the
/// document root and a location-index chain one key below it.
const EXTRA_LEVELS: usize = 2;

pub struct JsonTreeCodec {
    pretty: bool,
    max_nesting: usize,
}

impl Default for JsonTreeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonTreeCodec {
    /// Compact output.
    pub fn new() -> Self {
        Self {
            pretty: false,
            max_nesting: nesting_for(Limits::default()),
        }
    }

    /// Indented output.
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::new()
        }
    }

    /// Accepts documents as deep as trees encoded under `limits`.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.max_nesting = nesting_for(limits);
        self
    }

    pub fn id(&self) -> &'static str {
        "json"
    }

    pub fn encode(&mut self, tree: &Section) -> Result<Vec<u8>, CodecError> {
        let value = to_json_value(tree)?;
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&value)?
        } else {
            serde_json::to_vec(&value)?
        };
        Ok(bytes)
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Result<Section, CodecError> {
        check_nesting(bytes, self.max_nesting)?;
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        deserializer.disable_recursion_limit();
        let value = Value::deserialize(&mut deserializer)?;
        deserializer.end()?;
        from_json_value(value)
    }
}

fn nesting_for(limits: Limits) -> usize {
    limits.max_depth.saturating_add(EXTRA_LEVELS)
}

/// Rejects documents whose objects and arrays nest deeper than `limit`.
/// Brackets inside strings are skipped; anything malformed is left to the
/// parser.
fn check_nesting(bytes: &[u8], limit: usize) -> Result<(), CodecError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &byte in bytes {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > limit {
                    return Err(CodecError::TooDeep { limit });
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

impl TreeCodec for JsonTreeCodec {
    fn id(&self) -> &'static str {
        self.id()
    }

    fn encode(&mut self, tree: &Section) -> Result<Vec<u8>, CodecError> {
        self.encode(tree)
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<Section, CodecError> {
        self.decode(bytes)
    }
}

// ── Tree → JSON ───────────────────────────────────────────────────────────

/// Converts a tree into a JSON object.
pub fn to_json_value(tree: &Section) -> Result<Value, CodecError> {
    section_to_json(tree, "")
}

fn section_to_json(section: &Section, path: &str) -> Result<Value, CodecError> {
    let mut map = Map::with_capacity(section.len());
    for (key, value) in section.iter() {
        let key_path = join(path, key);
        let json = match value {
            PrimitiveValue::Null => Value::Null,
            PrimitiveValue::Bool(v) => Value::Bool(*v),
            PrimitiveValue::Integer(v) => Value::Number((*v).into()),
            PrimitiveValue::Float(v) => Number::from_f64(*v)
                .map(Value::Number)
                .ok_or(CodecError::NonFiniteFloat { key: key_path.clone() })?,
            PrimitiveValue::Text(v) => Value::String(v.clone()),
            PrimitiveValue::Section(nested) => section_to_json(nested, &key_path)?,
        };
        map.insert(key.to_owned(), json);
    }
    Ok(Value::Object(map))
}

// ── JSON → Tree ───────────────────────────────────────────────────────────

/// Converts a JSON object into a tree. Any other document is
/// [`CodecError::NotAnObject`].
pub fn from_json_value(value: Value) -> Result<Section, CodecError> {
    match value {
        Value::Object(map) => object_to_section(map, ""),
        _ => Err(CodecError::NotAnObject),
    }
}

fn object_to_section(map: Map<String, Value>, path: &str) -> Result<Section, CodecError> {
    let mut section = Section::new();
    for (key, value) in map {
        let key_path = join(path, &key);
        let primitive = match value {
            Value::Null => PrimitiveValue::Null,
            Value::Bool(v) => PrimitiveValue::Bool(v),
            Value::Number(n) => number_to_primitive(&n, &key_path)?,
            Value::String(v) => PrimitiveValue::Text(v),
            Value::Object(nested) => PrimitiveValue::Section(object_to_section(nested, &key_path)?),
            Value::Array(_) => {
                return Err(CodecError::UnsupportedValue {
                    key: key_path,
                    kind: "array",
                })
            }
        };
        section.insert(key, primitive);
    }
    Ok(section)
}

fn number_to_primitive(n: &Number, key_path: &str) -> Result<PrimitiveValue, CodecError> {
    if let Some(v) = n.as_i64() {
        return Ok(PrimitiveValue::Integer(v));
    }
    if n.is_u64() {
        return Err(CodecError::UnsupportedValue {
            key: key_path.to_owned(),
            kind: "integer beyond the 64-bit signed range",
        });
    }
    n.as_f64()
        .map(PrimitiveValue::Float)
        .ok_or_else(|| CodecError::NonFiniteFloat {
            key: key_path.to_owned(),
        })
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}
