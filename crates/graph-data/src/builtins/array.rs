//! Fixed-length arrays with a declared element type.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::{index_key, SIZE_KEY};
use crate::converter::Converter;
use crate::decoder::DataIn;
use crate::encoder::DataOut;
use crate::error::DataError;
use crate::object::{downcast_rc, Object, ObjectRef, Typed};
use crate::types::{Expected, ObjectType};
use crate::value::Value;

use super::collection::read_size;

/// Array whose wire name is `[<element>]`, e.g. `[i64]` or `[[Pet]]`.
#[derive(Debug)]
pub struct Array {
    element: Expected,
    items: RefCell<Vec<Value>>,
}

impl Array {
    pub fn new(element: Expected) -> Self {
        Self {
            element,
            items: RefCell::new(Vec::new()),
        }
    }

    /// Array of `len` default elements: zero for numbers, `false` for bools
    /// and `Null` otherwise.
    pub fn filled(element: Expected, len: usize) -> Self {
        let fill = match element {
            Expected::Integer => Value::Integer(0),
            Expected::Float => Value::Float(0.0),
            Expected::Bool => Value::Bool(false),
            _ => Value::Null,
        };
        Self {
            element,
            items: RefCell::new(vec![fill; len]),
        }
    }

    /// Array of the given values. Fails on the first value the element type
    /// does not admit.
    pub fn from_values<I, V>(element: Expected, values: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let array = Self::new(element);
        {
            let mut items = array.items.borrow_mut();
            for (index, value) in values.into_iter().map(Into::into).enumerate() {
                if !admits(&array.element, &value) {
                    return Err(DataError::wrong_type(
                        index_key(index),
                        array.element.type_name(),
                        value.type_name(),
                    ));
                }
                items.push(value);
            }
        }
        Ok(array)
    }

    pub fn element(&self) -> &Expected {
        &self.element
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// Replaces the element at `index`. `false` when the index is out of
    /// bounds or the element type does not admit `value`.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> bool {
        let value = value.into();
        if !admits(&self.element, &value) {
            return false;
        }
        match self.items.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

fn admits(element: &Expected, value: &Value) -> bool {
    match (element, value) {
        (Expected::Any, Value::Section(_)) => false,
        (Expected::Any, _) => true,
        (Expected::Bool, Value::Bool(_))
        | (Expected::Integer, Value::Integer(_))
        | (Expected::Float, Value::Float(_))
        | (Expected::Text, Value::Text(_))
        | (Expected::Object(_), Value::Null)
        | (Expected::Text, Value::Null) => true,
        (Expected::Object(want), Value::Object(object)) => want.accepts(&object.object_type()),
        _ => false,
    }
}

impl Object for Array {
    fn object_type(&self) -> ObjectType {
        ObjectType::array_of(self.element.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl Typed for Array {
    fn static_type() -> ObjectType {
        ObjectType::array_of(Expected::Any)
    }
}

/// Handles every array type: `size` followed by one numeric key per element.
pub struct ArrayConverter;

impl Converter for ArrayConverter {
    fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError> {
        let array = downcast_rc::<Array>(object).ok_or_else(|| {
            DataError::custom(format!("`{}` is not an Array", object.object_type()))
        })?;
        let items = array.to_vec();
        out.write(SIZE_KEY, items.len() as i64)?;
        for (index, item) in items.into_iter().enumerate() {
            out.write(index_key(index), item)?;
        }
        Ok(())
    }

    fn create(&self, data: &DataIn, object_type: &ObjectType) -> Result<ObjectRef, DataError> {
        let element = match object_type {
            ObjectType::Array(element) => (**element).clone(),
            ObjectType::Named(info) => {
                return Err(DataError::invalid(format!("`{}` is not an array", info.name)))
            }
        };
        Ok(Rc::new(Array::filled(element, read_size(data)?)))
    }

    fn initialise(&self, data: &DataIn, object: &ObjectRef) -> Result<(), DataError> {
        let array = downcast_rc::<Array>(object)
            .ok_or_else(|| DataError::custom("array placeholder is not an Array"))?;
        for index in 0..array.len() {
            let key = index_key(index);
            let value = data.read_value(&key, array.element())?;
            if value.is_null() {
                continue;
            }
            if !array.set(index, value.clone()) {
                return Err(DataError::wrong_type(
                    key,
                    array.element().type_name(),
                    value.type_name(),
                ));
            }
        }
        Ok(())
    }
}
