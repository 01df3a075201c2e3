//! Enumerations, stored by variant name.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::converter::Converter;
use crate::decoder::DataIn;
use crate::encoder::DataOut;
use crate::error::DataError;
use crate::object::{downcast_rc, Object, ObjectRef, Typed};
use crate::types::{ObjectType, TypeInfo};

/// Common ancestor of every enumeration type. Enumerations extend it and list
/// their variant names:
///
/// ```
/// use graph_data::builtins::ENUM;
/// use graph_data::TypeInfo;
///
/// static SUIT: TypeInfo = TypeInfo::class("Suit")
///     .extends(&ENUM)
///     .with_variants(&["Hearts", "Spades"]);
/// assert_eq!(SUIT.variant_index("Spades"), Some(1));
/// ```
pub static ENUM: TypeInfo = TypeInfo::class("Enum");

/// One variant of an enumeration type.
#[derive(Clone, Copy)]
pub struct EnumValue {
    info: &'static TypeInfo,
    index: usize,
}

impl EnumValue {
    /// The variant of `info` called `name`, if it has one.
    pub fn new(info: &'static TypeInfo, name: &str) -> Option<Self> {
        info.variant_index(name).map(|index| Self { info, index })
    }

    pub fn of<E: GraphEnum>(variant: E) -> Self {
        Self {
            info: E::type_info(),
            index: variant.ordinal(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.info.variants.get(self.index).copied().unwrap_or_default()
    }

    pub fn ordinal(&self) -> usize {
        self.index
    }

    pub fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    /// Converts back into the Rust enum declared for this type.
    pub fn to<E: GraphEnum>(&self) -> Option<E> {
        if E::type_info() != self.info {
            return None;
        }
        E::from_ordinal(self.index)
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info && self.index == other.index
    }
}

impl Eq for EnumValue {}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.info.name, self.name())
    }
}

impl Object for EnumValue {
    fn object_type(&self) -> ObjectType {
        ObjectType::Named(self.info)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl Typed for EnumValue {
    fn static_type() -> ObjectType {
        ObjectType::Named(&ENUM)
    }
}

/// Bridges a fieldless Rust enum to its [`TypeInfo`] variants.
pub trait GraphEnum: Copy + 'static {
    fn type_info() -> &'static TypeInfo;

    /// Position of this variant in `type_info().variants`.
    fn ordinal(self) -> usize;

    fn from_ordinal(ordinal: usize) -> Option<Self>;
}

pub struct EnumConverter;

impl Converter for EnumConverter {
    fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError> {
        let value = downcast_rc::<EnumValue>(object).ok_or_else(|| {
            DataError::custom(format!("`{}` is not an EnumValue", object.object_type()))
        })?;
        out.write("name", value.name())?;
        Ok(())
    }

    fn create(&self, data: &DataIn, object_type: &ObjectType) -> Result<ObjectRef, DataError> {
        let info = object_type
            .info()
            .ok_or_else(|| DataError::invalid(format!("`{object_type}` is not an enum")))?;
        let name = data.read_string("name")?;
        let value = EnumValue::new(info, &name).ok_or_else(|| {
            DataError::invalid(format!("`{}` has no variant `{name}`", info.name))
        })?;
        Ok(Rc::new(value))
    }

    fn initialise(&self, _: &DataIn, _: &ObjectRef) -> Result<(), DataError> {
        Ok(())
    }
}
