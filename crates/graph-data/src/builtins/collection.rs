//! Ordered and unordered sequences of values.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::constants::{index_key, SIZE_KEY};
use crate::converter::Converter;
use crate::decoder::DataIn;
use crate::encoder::DataOut;
use crate::error::DataError;
use crate::object::{downcast_rc, Object, ObjectRef, Typed};
use crate::types::{ObjectType, TypeInfo};
use crate::value::{Value, ValueKey};

pub static COLLECTION: TypeInfo = TypeInfo::interface("Collection");
pub static LIST: TypeInfo = TypeInfo::class("List").implements(&[&COLLECTION]);
pub static SET: TypeInfo = TypeInfo::class("Set").implements(&[&COLLECTION]);

/// Ordered sequence. Subtypes of [`LIST`] may reuse it by passing their own
/// descriptor to [`List::with_type`].
#[derive(Debug)]
pub struct List {
    info: &'static TypeInfo,
    items: RefCell<Vec<Value>>,
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl List {
    pub fn new() -> Self {
        Self::with_type(&LIST)
    }

    pub fn with_type(info: &'static TypeInfo) -> Self {
        Self {
            info,
            items: RefCell::new(Vec::new()),
        }
    }

    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Self::new();
        list.items
            .borrow_mut()
            .extend(values.into_iter().map(Into::into));
        list
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.items.borrow_mut().push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }
}

/// Unordered collection without duplicates. Objects are distinct by identity,
/// scalars by value.
#[derive(Debug)]
pub struct ValueSet {
    info: &'static TypeInfo,
    items: RefCell<IndexMap<ValueKey, Value>>,
}

impl Default for ValueSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueSet {
    pub fn new() -> Self {
        Self::with_type(&SET)
    }

    pub fn with_type(info: &'static TypeInfo) -> Self {
        Self {
            info,
            items: RefCell::new(IndexMap::new()),
        }
    }

    /// Adds `value`; `false` if an equal element is already present.
    pub fn insert(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        match self.items.borrow_mut().entry(value.key()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.borrow().contains_key(&value.key())
    }

    /// Removes an equal element; `false` if none was present.
    pub fn remove(&self, value: &Value) -> bool {
        self.items.borrow_mut().shift_remove(&value.key()).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Snapshot of the current elements in insertion order.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }
}

macro_rules! sequence_object {
    ($ty:ty, $default:path) => {
        impl Object for $ty {
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

        impl Typed for $ty {
            fn static_type() -> ObjectType {
                ObjectType::Named(&$default)
            }
        }
    };
}

sequence_object!(List, LIST);
sequence_object!(ValueSet, SET);

/// Covers every [`COLLECTION`]: `size` followed by one numeric key per
/// element. Decoding recreates a [`ValueSet`] for subtypes of [`SET`] and a
/// [`List`] otherwise.
pub struct CollectionConverter;

impl Converter for CollectionConverter {
    fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError> {
        let items = if let Some(list) = downcast_rc::<List>(object) {
            list.to_vec()
        } else if let Some(set) = downcast_rc::<ValueSet>(object) {
            set.to_vec()
        } else {
            return Err(DataError::custom(format!(
                "`{}` is not a List or ValueSet",
                object.object_type()
            )));
        };
        out.write(SIZE_KEY, items.len() as i64)?;
        for (index, item) in items.into_iter().enumerate() {
            out.write(index_key(index), item)?;
        }
        Ok(())
    }

    fn create(&self, _: &DataIn, object_type: &ObjectType) -> Result<ObjectRef, DataError> {
        let info = object_type
            .info()
            .ok_or_else(|| DataError::invalid(format!("`{object_type}` is not a collection")))?;
        if info.is_subtype_of(&SET) {
            Ok(Rc::new(ValueSet::with_type(info)))
        } else {
            Ok(Rc::new(List::with_type(info)))
        }
    }

    fn initialise(&self, data: &DataIn, object: &ObjectRef) -> Result<(), DataError> {
        let size = read_size(data)?;
        if let Some(list) = downcast_rc::<List>(object) {
            for index in 0..size {
                list.push(read_element(data, index)?);
            }
        } else if let Some(set) = downcast_rc::<ValueSet>(object) {
            for index in 0..size {
                set.insert(read_element(data, index)?);
            }
        }
        Ok(())
    }
}

/// Reads the `size` key shared by sequences, maps and arrays. Every element
/// owns at least one key of its own, so a size above the section's key count
/// cannot describe stored data.
pub(crate) fn read_size(data: &DataIn) -> Result<usize, DataError> {
    let size = data.read_i64(SIZE_KEY)?;
    let size =
        usize::try_from(size).map_err(|_| DataError::invalid(format!("negative size {size}")))?;
    let keys = data.keys().len();
    if size > keys {
        return Err(DataError::invalid(format!(
            "size {size} exceeds the {keys} keys stored"
        )));
    }
    Ok(size)
}

fn read_element(data: &DataIn, index: usize) -> Result<Value, DataError> {
    Ok(data.read::<Value>(&index_key(index))?.unwrap_or(Value::Null))
}
