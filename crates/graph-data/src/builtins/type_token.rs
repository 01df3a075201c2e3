//! Type descriptors stored as values.

use std::any::Any;
use std::rc::Rc;

use crate::converter::Converter;
use crate::decoder::DataIn;
use crate::encoder::DataOut;
use crate::error::DataError;
use crate::object::{downcast_rc, Object, ObjectRef, Typed};
use crate::types::{ObjectType, TypeInfo};

pub static TYPE_TOKEN: TypeInfo = TypeInfo::class("Type");

/// A reference to a registered type, such as the element type of a
/// container that is decoded later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeToken {
    target: ObjectType,
}

impl TypeToken {
    pub fn new(target: ObjectType) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &ObjectType {
        &self.target
    }
}

impl Object for TypeToken {
    fn object_type(&self) -> ObjectType {
        ObjectType::Named(&TYPE_TOKEN)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl Typed for TypeToken {
    fn static_type() -> ObjectType {
        ObjectType::Named(&TYPE_TOKEN)
    }
}

/// Stores the wire name of the target under `name`.
pub struct TypeTokenConverter;

impl Converter for TypeTokenConverter {
    fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError> {
        let token = downcast_rc::<TypeToken>(object).ok_or_else(|| {
            DataError::custom(format!("`{}` is not a TypeToken", object.object_type()))
        })?;
        out.write("name", token.target.name())?;
        Ok(())
    }

    fn create(&self, data: &DataIn, _: &ObjectType) -> Result<ObjectRef, DataError> {
        let name = data.read_string("name")?;
        let target = data
            .registry()
            .resolve_name(&name)
            .ok_or_else(|| DataError::invalid(format!("unknown type `{name}`")))?;
        Ok(Rc::new(TypeToken::new(target)))
    }

    fn initialise(&self, _: &DataIn, _: &ObjectRef) -> Result<(), DataError> {
        Ok(())
    }
}
