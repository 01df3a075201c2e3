//! Byte-level formats for `graph-data` primitive trees.
//!
//! A [`Section`](graph_data::Section) produced by an encoder is written out
//! through a [`TreeCodec`] and read back into a tree that a decoder can
//! consume. Sections map to objects of the target format; numeric keys are
//! not special-cased.

pub mod codecs;

pub use codecs::{from_json_value, to_json_value, CodecError, JsonTreeCodec, TreeCodec};
