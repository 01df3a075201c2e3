//! Scalars stored as objects, for slots that need a shared identity or an
//! object type.

use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::converter::Converter;
use crate::decoder::DataIn;
use crate::encoder::DataOut;
use crate::error::DataError;
use crate::object::{downcast_rc, Object, ObjectRef, Typed};
use crate::registry::TypeRegistry;
use crate::types::{ObjectType, TypeInfo};
use crate::value::Value;

const VALUE_KEY: &str = "value";

pub static BOOLEAN: TypeInfo = TypeInfo::class("Boolean");
pub static BYTE: TypeInfo = TypeInfo::class("Byte");
pub static SHORT: TypeInfo = TypeInfo::class("Short");
pub static INTEGER: TypeInfo = TypeInfo::class("Integer");
pub static LONG: TypeInfo = TypeInfo::class("Long");
pub static FLOAT: TypeInfo = TypeInfo::class("Float");
pub static DOUBLE: TypeInfo = TypeInfo::class("Double");
pub static CHARACTER: TypeInfo = TypeInfo::class("Character");

/// A scalar that can live inside a [`Boxed`].
pub trait BoxedScalar: Copy + PartialEq + Debug + 'static {
    fn type_info() -> &'static TypeInfo;

    fn store(self) -> Value;

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError>;
}

fn narrow<T: TryFrom<i64>>(data: &DataIn, key: &str, name: &str) -> Result<T, DataError> {
    let value = data.read_i64(key)?;
    T::try_from(value).map_err(|_| DataError::wrong_type(key, name, format!("integer {value}")))
}

impl BoxedScalar for bool {
    fn type_info() -> &'static TypeInfo {
        &BOOLEAN
    }

    fn store(self) -> Value {
        Value::Bool(self)
    }

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError> {
        data.read_bool(key)
    }
}

impl BoxedScalar for i8 {
    fn type_info() -> &'static TypeInfo {
        &BYTE
    }

    fn store(self) -> Value {
        Value::Integer(self.into())
    }

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError> {
        narrow(data, key, "i8")
    }
}

impl BoxedScalar for i16 {
    fn type_info() -> &'static TypeInfo {
        &SHORT
    }

    fn store(self) -> Value {
        Value::Integer(self.into())
    }

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError> {
        narrow(data, key, "i16")
    }
}

impl BoxedScalar for i32 {
    fn type_info() -> &'static TypeInfo {
        &INTEGER
    }

    fn store(self) -> Value {
        Value::Integer(self.into())
    }

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError> {
        data.read_i32(key)
    }
}

impl BoxedScalar for i64 {
    fn type_info() -> &'static TypeInfo {
        &LONG
    }

    fn store(self) -> Value {
        Value::Integer(self)
    }

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError> {
        data.read_i64(key)
    }
}

impl BoxedScalar for f32 {
    fn type_info() -> &'static TypeInfo {
        &FLOAT
    }

    fn store(self) -> Value {
        Value::Float(self.into())
    }

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError> {
        data.read_f32(key)
    }
}

impl BoxedScalar for f64 {
    fn type_info() -> &'static TypeInfo {
        &DOUBLE
    }

    fn store(self) -> Value {
        Value::Float(self)
    }

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError> {
        data.read_f64(key)
    }
}

/// Stored as its code point.
impl BoxedScalar for char {
    fn type_info() -> &'static TypeInfo {
        &CHARACTER
    }

    fn store(self) -> Value {
        Value::Integer(u32::from(self).into())
    }

    fn load(data: &DataIn, key: &str) -> Result<Self, DataError> {
        let code = narrow::<u32>(data, key, "char")?;
        char::from_u32(code)
            .ok_or_else(|| DataError::invalid(format!("{code:#x} at `{key}` is not a code point")))
    }
}

/// A scalar wrapped in an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boxed<T: BoxedScalar> {
    value: T,
}

impl<T: BoxedScalar> Boxed<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get(&self) -> T {
        self.value
    }
}

impl<T: BoxedScalar> Object for Boxed<T> {
    fn object_type(&self) -> ObjectType {
        ObjectType::Named(T::type_info())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl<T: BoxedScalar> Typed for Boxed<T> {
    fn static_type() -> ObjectType {
        ObjectType::Named(T::type_info())
    }
}

/// Writes the wrapped scalar under `value`.
pub struct BoxedConverter<T>(PhantomData<fn() -> T>);

impl<T> BoxedConverter<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for BoxedConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BoxedScalar> Converter for BoxedConverter<T> {
    fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError> {
        let boxed = downcast_rc::<Boxed<T>>(object).ok_or_else(|| {
            DataError::custom(format!("`{}` is not a boxed scalar", object.object_type()))
        })?;
        out.write(VALUE_KEY, boxed.value.store())?;
        Ok(())
    }

    fn create(&self, data: &DataIn, _: &ObjectType) -> Result<ObjectRef, DataError> {
        Ok(Rc::new(Boxed::new(T::load(data, VALUE_KEY)?)))
    }

    fn initialise(&self, _: &DataIn, _: &ObjectRef) -> Result<(), DataError> {
        Ok(())
    }
}

fn register<T: BoxedScalar>(registry: &TypeRegistry) {
    registry.register(T::type_info(), BoxedConverter::<T>::new());
}

pub(crate) fn install(registry: &TypeRegistry) {
    register::<bool>(registry);
    register::<i8>(registry);
    register::<i16>(registry);
    register::<i32>(registry);
    register::<i64>(registry);
    register::<f32>(registry);
    register::<f64>(registry);
    register::<char>(registry);
}
