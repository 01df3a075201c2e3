//! Types that write themselves and are rebuilt through an [`Allocator`].
//!
//! [`Allocator`]: crate::Allocator

use crate::converter::Converter;
use crate::decoder::DataIn;
use crate::encoder::DataOut;
use crate::error::DataError;
use crate::object::ObjectRef;
use crate::types::{ObjectType, TypeInfo};

/// Capability interface of self-describing types. Declare it among a type's
/// interfaces to route the type through [`SerializableConverter`].
pub static SERIALIZABLE: TypeInfo = TypeInfo::interface("Serializable");

pub trait Serializable {
    /// Writes this object's fields into the empty section behind `out`.
    fn bundle_into(&self, out: &mut DataOut<'_>) -> Result<(), DataError>;
}

pub struct SerializableConverter;

impl SerializableConverter {
    fn allocator_for(
        data: &DataIn,
        object_type: &ObjectType,
    ) -> Result<std::sync::Arc<crate::creator::Allocator>, DataError> {
        object_type
            .info()
            .and_then(|info| data.registry().allocator(info))
            .ok_or_else(|| {
                DataError::custom(format!("no allocator registered for `{object_type}`"))
            })
    }
}

impl Converter for SerializableConverter {
    fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError> {
        let serializable = object.as_serializable().ok_or_else(|| {
            DataError::custom(format!(
                "`{}` does not implement Serializable",
                object.object_type()
            ))
        })?;
        serializable.bundle_into(out)
    }

    fn create(&self, data: &DataIn, object_type: &ObjectType) -> Result<ObjectRef, DataError> {
        Ok(Self::allocator_for(data, object_type)?.allocate())
    }

    fn initialise(&self, data: &DataIn, object: &ObjectRef) -> Result<(), DataError> {
        Self::allocator_for(data, &object.object_type())?.run_constructor(object, data)
    }
}
