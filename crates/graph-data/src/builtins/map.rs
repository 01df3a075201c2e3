//! Associative maps with arbitrary keys.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::constants::{map_key, map_value, SIZE_KEY};
use crate::converter::Converter;
use crate::decoder::DataIn;
use crate::encoder::DataOut;
use crate::error::DataError;
use crate::object::{downcast_rc, Object, ObjectRef, Typed};
use crate::types::{ObjectType, TypeInfo};
use crate::value::{Value, ValueKey};

use super::collection::read_size;

pub static MAP: TypeInfo = TypeInfo::class("Map");

/// Map keyed by [`Value`]: objects compare by identity, scalars by value.
#[derive(Debug)]
pub struct ValueMap {
    info: &'static TypeInfo,
    entries: RefCell<IndexMap<ValueKey, (Value, Value)>>,
}

impl Default for ValueMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueMap {
    pub fn new() -> Self {
        Self::with_type(&MAP)
    }

    pub fn with_type(info: &'static TypeInfo) -> Self {
        Self {
            info,
            entries: RefCell::new(IndexMap::new()),
        }
    }

    /// Inserts an entry, returning the value it replaced. A replaced entry
    /// keeps its key and position.
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.borrow_mut().entry(key.key()) {
            Entry::Occupied(mut slot) => Some(std::mem::replace(&mut slot.get_mut().1, value)),
            Entry::Vacant(slot) => {
                slot.insert((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries
            .borrow()
            .get(&key.key())
            .map(|(_, v)| v.clone())
    }

    pub fn remove(&self, key: &Value) -> Option<Value> {
        self.entries
            .borrow_mut()
            .shift_remove(&key.key())
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Snapshot of the current entries in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.entries.borrow().values().cloned().collect()
    }
}

impl Object for ValueMap {
    fn object_type(&self) -> ObjectType {
        ObjectType::Named(self.info)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn std::any::Any> {
        self
    }
}

impl Typed for ValueMap {
    fn static_type() -> ObjectType {
        ObjectType::Named(&MAP)
    }
}

/// Writes `"<i>-k"` / `"<i>-v"` pairs followed by `size`.
pub struct MapConverter;

impl Converter for MapConverter {
    fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError> {
        let map = downcast_rc::<ValueMap>(object).ok_or_else(|| {
            DataError::custom(format!("`{}` is not a ValueMap", object.object_type()))
        })?;
        let entries = map.entries();
        for (index, (key, value)) in entries.iter().enumerate() {
            out.write(map_key(index), key.clone())?;
            out.write(map_value(index), value.clone())?;
        }
        out.write(SIZE_KEY, entries.len() as i64)?;
        Ok(())
    }

    fn create(&self, _: &DataIn, object_type: &ObjectType) -> Result<ObjectRef, DataError> {
        let info = object_type
            .info()
            .ok_or_else(|| DataError::invalid(format!("`{object_type}` is not a map")))?;
        Ok(Rc::new(ValueMap::with_type(info)))
    }

    fn initialise(&self, data: &DataIn, object: &ObjectRef) -> Result<(), DataError> {
        let map = downcast_rc::<ValueMap>(object)
            .ok_or_else(|| DataError::custom("map placeholder is not a ValueMap"))?;
        for index in 0..read_size(data)? {
            let key = data.read::<Value>(&map_key(index))?.unwrap_or(Value::Null);
            let value = data.read::<Value>(&map_value(index))?.unwrap_or(Value::Null);
            map.insert(key, value);
        }
        Ok(())
    }
}
