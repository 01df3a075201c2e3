//! The pluggable per-type conversion contract.

use crate::decoder::DataIn;
use crate::encoder::DataOut;
use crate::error::DataError;
use crate::object::ObjectRef;
use crate::types::ObjectType;

/// Converts objects of one registered type (and, through the registry's
/// hierarchy walk, its subtypes) to and from a section.
///
/// Decoding is split in two so cyclic graphs can be rebuilt: `create` hands
/// back an addressable placeholder that the decoder registers under the
/// object's identity, and only then does `initialise` read nested fields,
/// which may resolve back to that same placeholder.
pub trait Converter: Send + Sync {
    /// Writes `object`'s data into the freshly created section behind `out`.
    fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError>;

    /// Produces an empty placeholder for the stored concrete type.
    ///
    /// Nested fields must not be read here: none of them is guaranteed to be
    /// constructible yet.
    fn create(&self, data: &DataIn, object_type: &ObjectType) -> Result<ObjectRef, DataError>;

    /// Populates the exact instance returned by [`Converter::create`].
    fn initialise(&self, data: &DataIn, object: &ObjectRef) -> Result<(), DataError>;
}
