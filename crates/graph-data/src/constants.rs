//! Reserved wire vocabulary.
//!
//! These names are part of the serialized format and must be preserved
//! bit-for-bit by any compatible reader or writer.

/// Key holding the concrete type name inside an object's section.
pub const CLASSNAME_KEY: &str = "__classname";

/// Key holding the identity marker inside an object's section.
pub const ID_KEY: &str = "__id";

/// Length key used by sequence, array and map converters.
pub const SIZE_KEY: &str = "size";

/// Prefix of identity markers and of root-level location-index sections.
pub const MARKER_PREFIX: &str = "__#";

/// Suffix pairing a map entry's key.
pub const MAP_KEY_SUFFIX: &str = "-k";

/// Suffix pairing a map entry's value.
pub const MAP_VALUE_SUFFIX: &str = "-v";

/// Key of the `index`-th element of a sequence or array.
pub fn index_key(index: usize) -> String {
    index.to_string()
}

/// Key of the `index`-th map entry's key.
pub fn map_key(index: usize) -> String {
    format!("{index}{MAP_KEY_SUFFIX}")
}

/// Key of the `index`-th map entry's value.
pub fn map_value(index: usize) -> String {
    format!("{index}{MAP_VALUE_SUFFIX}")
}

/// Identity marker for a per-operation token.
pub fn marker(token: u64) -> String {
    format!("{MARKER_PREFIX}{token}")
}

/// Returns `true` when `text` is an identity marker rather than plain text.
pub fn is_marker(text: &str) -> bool {
    text.starts_with(MARKER_PREFIX)
}
