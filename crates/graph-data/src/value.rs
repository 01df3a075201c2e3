//! Dynamic values written to and read from cursors.

use std::fmt;
use std::rc::Rc;

use crate::decoder::DataIn;
use crate::object::{address, downcast_rc, Object, ObjectRef, Typed};
use crate::types::Expected;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Object(ObjectRef),
    /// A plain nested data cursor (a section without `__classname`).
    Section(Rc<DataIn>),
}

impl Value {
    pub fn object(object: ObjectRef) -> Self {
        Value::Object(object)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&Rc<DataIn>> {
        match self {
            Value::Section(v) => Some(v),
            _ => None,
        }
    }

    pub fn downcast<T: Object>(&self) -> Option<Rc<T>> {
        self.as_object().and_then(downcast_rc::<T>)
    }

    /// Short description used in type-mismatch errors.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_owned(),
            Value::Bool(_) => "bool".to_owned(),
            Value::Integer(_) => "integer".to_owned(),
            Value::Float(_) => "float".to_owned(),
            Value::Text(_) => "text".to_owned(),
            Value::Object(object) => object.object_type().name(),
            Value::Section(_) => "section".to_owned(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Integer(v) => f.debug_tuple("Integer").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Value::Object(object) => write!(
                f,
                "Object({}@{:p})",
                object.object_type(),
                Rc::as_ptr(object) as *const ()
            ),
            Value::Section(section) => write!(f, "Section({:?})", section.path()),
        }
    }
}

/// Hashable form of a [`Value`] with the same equality, used to key maps and
/// sets. Floats key by bit pattern with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Null,
    Bool(bool),
    Integer(i64),
    Float(u64),
    Text(String),
    Object(usize),
    Section(usize),
}

impl Value {
    pub(crate) fn key(&self) -> ValueKey {
        match self {
            Value::Null => ValueKey::Null,
            Value::Bool(v) => ValueKey::Bool(*v),
            Value::Integer(v) => ValueKey::Integer(*v),
            Value::Float(v) if *v == 0.0 => ValueKey::Float(0f64.to_bits()),
            Value::Float(v) => ValueKey::Float(v.to_bits()),
            Value::Text(v) => ValueKey::Text(v.clone()),
            Value::Object(object) => ValueKey::Object(address(object)),
            Value::Section(section) => ValueKey::Section(Rc::as_ptr(section) as usize),
        }
    }
}

/// Scalars compare by value, objects and sections by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (Value::Section(a), Value::Section(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl<T: Object> From<Rc<T>> for Value {
    fn from(value: Rc<T>) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A Rust type that can be read back from a decode cursor.
pub trait Readable: Sized {
    /// Type requested from the cursor.
    fn expected() -> Expected;

    /// Extracts `Self` from a non-null value already checked against
    /// [`Readable::expected`]. `None` reports a type mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

impl Readable for Value {
    fn expected() -> Expected {
        Expected::Any
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl Readable for bool {
    fn expected() -> Expected {
        Expected::Bool
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Readable for i64 {
    fn expected() -> Expected {
        Expected::Integer
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i64()
    }
}

impl Readable for i32 {
    fn expected() -> Expected {
        Expected::Integer
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_i64().and_then(|v| i32::try_from(v).ok())
    }
}

impl Readable for f64 {
    fn expected() -> Expected {
        Expected::Float
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_f64()
    }
}

impl Readable for f32 {
    fn expected() -> Expected {
        Expected::Float
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl Readable for String {
    fn expected() -> Expected {
        Expected::Text
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Typed> Readable for Rc<T> {
    fn expected() -> Expected {
        Expected::Object(T::static_type())
    }

    fn from_value(value: Value) -> Option<Self> {
        value.downcast::<T>()
    }
}
