//! Common codec traits and errors.

use std::io::{Read, Write};

use graph_data::Section;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document root is not an object")]
    NotAnObject,
    #[error("unsupported {kind} at `{key}`")]
    UnsupportedValue { key: String, kind: &'static str },
    #[error("non-finite float at `{key}`")]
    NonFiniteFloat { key: String },
    #[error("document nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Translates a primitive tree to and from one wire format.
pub trait TreeCodec {
    fn id(&self) -> &'static str;
    fn encode(&mut self, tree: &Section) -> Result<Vec<u8>, CodecError>;
    fn decode(&mut self, bytes: &[u8]) -> Result<Section, CodecError>;

    /// Reads `reader` to the end and decodes it.
    fn read_from<R: Read>(&mut self, mut reader: R) -> Result<Section, CodecError>
    where
        Self: Sized,
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.decode(&bytes)
    }

    fn write_to<W: Write>(&mut self, tree: &Section, mut writer: W) -> Result<(), CodecError>
    where
        Self: Sized,
    {
        let bytes = self.encode(tree)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}
