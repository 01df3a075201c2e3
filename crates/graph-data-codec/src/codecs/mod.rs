//! Tree codecs.

mod json;
mod types;

pub use json::{from_json_value, to_json_value, JsonTreeCodec};
pub use types::{CodecError, TreeCodec};
