//! Error taxonomy shared by the tree, the registry and both engines.

use thiserror::Error;

/// Boxed cause raised from inside converter or constructor code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DataError {
    /// A requested key has no value at all.
    #[error("no data mapped to `{key}`")]
    MissingData { key: String },
    /// A key exists but holds something other than what was requested.
    #[error("expected {expected} at `{key}` but found {found}")]
    WrongType {
        key: String,
        expected: String,
        found: String,
    },
    /// The data contradicts itself or names something that cannot be loaded.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// A converter's serialize/create/initialise step failed.
    #[error("failed to convert `{type_name}`: {source}")]
    Serialization {
        type_name: String,
        #[source]
        source: Box<DataError>,
    },
    /// Cause raised by user converter code, before the engine wraps it.
    #[error("{0}")]
    Converter(BoxError),
}

impl DataError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingData { key: key.into() }
    }

    pub fn wrong_type(
        key: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::WrongType {
            key: key.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    /// Wraps an arbitrary converter failure.
    pub fn custom<E>(cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Converter(cause.into())
    }

    /// Wraps a failure raised while converting an object of `type_name`.
    pub fn serialization(type_name: impl Into<String>, source: DataError) -> Self {
        Self::Serialization {
            type_name: type_name.into(),
            source: Box::new(source),
        }
    }

    /// Data-shape failures that fallback reads are allowed to swallow.
    ///
    /// Converter failures are never recoverable: a broken converter must
    /// surface even through a fallback read.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingData { .. } | Self::WrongType { .. } | Self::InvalidData(_)
        )
    }
}
