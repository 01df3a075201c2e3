//! Read side: primitive tree to object graph.
//!
//! All cursors of one decode share the immutable tree and the identity map.
//! An object is registered under its marker as soon as its converter's
//! `create` returns, before `initialise` reads any nested field, so a field
//! pointing back at an unfinished object resolves to the same placeholder.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::constants::{is_marker, CLASSNAME_KEY, ID_KEY};
use crate::error::DataError;
use crate::object::ObjectRef;
use crate::registry::TypeRegistry;
use crate::tree::{PrimitiveValue, Section, ValueKind};
use crate::types::{Expected, ObjectType};
use crate::value::{Readable, Value};
use crate::Limits;

struct DecodeState {
    registry: TypeRegistry,
    root: Section,
    references: RefCell<HashMap<String, ObjectRef>>,
    limits: Limits,
    /// Objects currently between `create` and the end of `initialise`.
    active: Cell<usize>,
}

/// Decrements the active-object count when a materialization ends.
struct ActiveGuard<'a>(&'a Cell<usize>);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Read cursor scoped to one section of a decode operation.
pub struct DataIn {
    state: Rc<DecodeState>,
    path: Vec<String>,
    /// Objects and sub-cursors already produced from this section's keys.
    cache: RefCell<HashMap<String, Value>>,
}

impl DataIn {
    /// Root cursor of a new decode operation over `root`.
    pub fn new(registry: &TypeRegistry, root: Section) -> Self {
        Self::with_limits(registry, root, Limits::default())
    }

    pub fn with_limits(registry: &TypeRegistry, root: Section, limits: Limits) -> Self {
        let state = DecodeState {
            registry: registry.clone(),
            root,
            references: RefCell::new(HashMap::new()),
            limits,
            active: Cell::new(0),
        };
        Self::at(Rc::new(state), Vec::new())
    }

    fn at(state: Rc<DecodeState>, path: Vec<String>) -> Self {
        Self {
            state,
            path,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.state.registry
    }

    /// Keys from the root to this cursor's section.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    fn section(&self) -> Result<&Section, DataError> {
        self.state
            .root
            .section_at(&self.path)
            .ok_or_else(|| DataError::invalid(format!("no section at {:?}", self.path)))
    }

    fn child_path(&self, key: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(key.to_owned());
        path
    }

    pub fn keys(&self) -> Vec<String> {
        self.section()
            .map(|section| section.keys().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.section().is_ok_and(|section| section.contains(key))
    }

    pub fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.section().ok().and_then(|section| section.kind_of(key))
    }

    /// Reads `key` as `T`. A stored `Null` reads as `None`.
    pub fn read<T: Readable>(&self, key: &str) -> Result<Option<T>, DataError> {
        let expected = T::expected();
        let value = self.read_value(key, &expected)?;
        if value.is_null() {
            return Ok(None);
        }
        let found = value.type_name();
        match T::from_value(value) {
            Some(value) => Ok(Some(value)),
            None => Err(DataError::wrong_type(key, expected.type_name(), found)),
        }
    }

    /// Like [`DataIn::read`], but missing, mistyped, invalid or null data
    /// yields `fallback`. Converter failures still surface.
    pub fn read_or<T: Readable>(&self, key: &str, fallback: T) -> Result<T, DataError> {
        match self.read::<T>(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(fallback),
            Err(err) if err.is_recoverable() => {
                log::debug!("falling back for `{key}` at {:?}: {err}", self.path);
                Ok(fallback)
            }
            Err(err) => Err(err),
        }
    }

    /// Reads an object (or null) assignable to `object_type`.
    pub fn read_object(
        &self,
        key: &str,
        object_type: &ObjectType,
    ) -> Result<Option<ObjectRef>, DataError> {
        match self.read_value(key, &Expected::Object(object_type.clone()))? {
            Value::Object(object) => Ok(Some(object)),
            Value::Null => Ok(None),
            other => Err(DataError::wrong_type(key, object_type.name(), other.type_name())),
        }
    }

    /// Cursor over the plain nested section at `key`. Repeated calls hand
    /// back the same cursor.
    pub fn read_section(&self, key: &str) -> Result<Rc<DataIn>, DataError> {
        match self.read_value(key, &Expected::Section)? {
            Value::Section(section) => Ok(section),
            other => Err(DataError::wrong_type(key, "section", other.type_name())),
        }
    }

    /// Reads `key` as the requested type.
    ///
    /// Integers widen to floats, never the reverse. Text starting with the
    /// marker prefix is an object reference unless plain text was requested.
    /// Nested sections are either objects (they carry `__classname`) or plain
    /// data cursors.
    pub fn read_value(&self, key: &str, expected: &Expected) -> Result<Value, DataError> {
        let section = self.section()?;
        let stored = section.get(key).ok_or_else(|| DataError::missing(key))?;
        let mismatch = || DataError::wrong_type(key, expected.type_name(), stored.kind().as_str());
        match (stored, expected) {
            (PrimitiveValue::Null, _) => Ok(Value::Null),
            (PrimitiveValue::Bool(v), Expected::Any | Expected::Bool) => Ok(Value::Bool(*v)),
            (PrimitiveValue::Integer(v), Expected::Any | Expected::Integer) => {
                Ok(Value::Integer(*v))
            }
            (PrimitiveValue::Integer(v), Expected::Float) => Ok(Value::Float(*v as f64)),
            (PrimitiveValue::Float(v), Expected::Any | Expected::Float) => Ok(Value::Float(*v)),
            (PrimitiveValue::Text(text), Expected::Text) => Ok(Value::Text(text.clone())),
            (PrimitiveValue::Text(text), _) if is_marker(text) => {
                self.resolve_marker(key, text, expected).map(Value::Object)
            }
            (PrimitiveValue::Text(text), Expected::Any) => Ok(Value::Text(text.clone())),
            (PrimitiveValue::Section(data), _) => self.read_nested(key, data, expected),
            _ => Err(mismatch()),
        }
    }

    fn read_nested(&self, key: &str, data: &Section, expected: &Expected) -> Result<Value, DataError> {
        let cached = self.cache.borrow().get(key).cloned();
        if let Some(value) = cached {
            return check_cached(key, value, expected);
        }

        let value = if data.contains(CLASSNAME_KEY) {
            let id = data
                .get_text(ID_KEY)
                .map_err(|_| DataError::invalid(format!("object at `{key}` has no `{ID_KEY}`")))?
                .to_owned();
            let existing = self.state.references.borrow().get(&id).cloned();
            match existing {
                Some(object) => Value::Object(object),
                None => Value::Object(self.materialize(key, self.child_path(key), &id, expected)?),
            }
        } else {
            Value::Section(Rc::new(DataIn::at(
                Rc::clone(&self.state),
                self.child_path(key),
            )))
        };
        let value = check_cached(key, value, expected)?;
        self.cache.borrow_mut().insert(key.to_owned(), value.clone());
        Ok(value)
    }

    fn resolve_marker(
        &self,
        key: &str,
        marker: &str,
        expected: &Expected,
    ) -> Result<ObjectRef, DataError> {
        let existing = self.state.references.borrow().get(marker).cloned();
        if let Some(object) = existing {
            check_object(key, &object, expected)?;
            return Ok(object);
        }
        let path = self.locate(marker)?;
        self.materialize(key, path, marker, expected)
    }

    /// Follows the root-level location index of `marker` to the path of the
    /// object's data.
    fn locate(&self, marker: &str) -> Result<Vec<String>, DataError> {
        let root = &self.state.root;
        let mut index = root
            .get_section(marker)
            .map_err(|_| DataError::invalid(format!("no location index for {marker}")))?;
        let mut path = Vec::new();
        loop {
            let mut keys = index.keys();
            let next = match (keys.next(), keys.next()) {
                (None, _) => break,
                (Some(key), None) => key,
                (Some(_), Some(_)) => {
                    return Err(DataError::invalid(format!(
                        "location index for {marker} branches at {path:?}"
                    )))
                }
            };
            path.push(next.to_owned());
            index = index.get_section(next).map_err(|_| {
                DataError::invalid(format!("location index for {marker} is malformed"))
            })?;
        }
        Ok(path)
    }

    /// Builds the object whose data lives at `path`, registering it under
    /// `marker` between `create` and `initialise`.
    fn materialize(
        &self,
        key: &str,
        path: Vec<String>,
        marker: &str,
        expected: &Expected,
    ) -> Result<ObjectRef, DataError> {
        let state = &self.state;
        let data = state.root.section_at(&path).ok_or_else(|| {
            DataError::invalid(format!("{marker} points at {path:?}, which holds no object"))
        })?;
        let class_name = data
            .get_text(CLASSNAME_KEY)
            .map_err(|_| DataError::invalid(format!("object at {path:?} has no `{CLASSNAME_KEY}`")))?;
        match data.get_text(ID_KEY) {
            Ok(id) if id == marker => {}
            _ => {
                return Err(DataError::invalid(format!(
                    "object at {path:?} is not {marker}"
                )))
            }
        }

        let object_type = state
            .registry
            .resolve_name(class_name)
            .ok_or_else(|| DataError::invalid(format!("unknown type `{class_name}`")))?;
        if !expected.accepts_object(&object_type) {
            return Err(DataError::wrong_type(key, expected.type_name(), class_name));
        }
        let converter = state.registry.resolve(&object_type).ok_or_else(|| {
            DataError::invalid(format!("no converter registered for `{class_name}`"))
        })?;

        let max = state.limits.max_depth;
        if state.active.get() >= max {
            return Err(DataError::invalid(format!(
                "`{class_name}` at {path:?} exceeds the maximum nesting depth of {max}"
            )));
        }
        state.active.set(state.active.get() + 1);
        let _guard = ActiveGuard(&state.active);

        log::trace!("materializing `{class_name}` {marker} from {path:?}");
        let cursor = DataIn::at(Rc::clone(state), path);
        let object = converter
            .create(&cursor, &object_type)
            .map_err(|err| DataError::serialization(class_name, err))?;
        state
            .references
            .borrow_mut()
            .insert(marker.to_owned(), Rc::clone(&object));
        converter
            .initialise(&cursor, &object)
            .map_err(|err| DataError::serialization(class_name, err))?;
        Ok(object)
    }

    pub fn read_i64(&self, key: &str) -> Result<i64, DataError> {
        self.section()?.get_integer(key)
    }

    /// Reads an integer that must fit in 32 bits.
    pub fn read_i32(&self, key: &str) -> Result<i32, DataError> {
        let value = self.read_i64(key)?;
        i32::try_from(value)
            .map_err(|_| DataError::wrong_type(key, "i32", format!("integer {value}")))
    }

    pub fn read_f64(&self, key: &str) -> Result<f64, DataError> {
        self.section()?.get_float(key)
    }

    pub fn read_f32(&self, key: &str) -> Result<f32, DataError> {
        self.read_f64(key).map(|v| v as f32)
    }

    pub fn read_bool(&self, key: &str) -> Result<bool, DataError> {
        self.section()?.get_bool(key)
    }

    /// Raw text at `key`. Markers come back verbatim.
    pub fn read_string(&self, key: &str) -> Result<String, DataError> {
        self.section()?.get_text(key).map(str::to_owned)
    }

    pub fn read_i64_or(&self, key: &str, fallback: i64) -> i64 {
        self.read_i64(key).unwrap_or(fallback)
    }

    pub fn read_i32_or(&self, key: &str, fallback: i32) -> i32 {
        self.read_i32(key).unwrap_or(fallback)
    }

    pub fn read_f64_or(&self, key: &str, fallback: f64) -> f64 {
        self.read_f64(key).unwrap_or(fallback)
    }

    pub fn read_f32_or(&self, key: &str, fallback: f32) -> f32 {
        self.read_f32(key).unwrap_or(fallback)
    }

    pub fn read_bool_or(&self, key: &str, fallback: bool) -> bool {
        self.read_bool(key).unwrap_or(fallback)
    }

    pub fn read_string_or(&self, key: &str, fallback: &str) -> String {
        self.read_string(key).unwrap_or_else(|_| fallback.to_owned())
    }
}

fn check_object(key: &str, object: &ObjectRef, expected: &Expected) -> Result<(), DataError> {
    let actual = object.object_type();
    if expected.accepts_object(&actual) {
        Ok(())
    } else {
        Err(DataError::wrong_type(key, expected.type_name(), actual.name()))
    }
}

fn check_cached(key: &str, value: Value, expected: &Expected) -> Result<Value, DataError> {
    match &value {
        Value::Object(object) => check_object(key, object, expected)?,
        Value::Section(_) if matches!(expected, Expected::Any | Expected::Section) => {}
        other => {
            return Err(DataError::wrong_type(key, expected.type_name(), other.type_name()))
        }
    }
    Ok(value)
}

impl fmt::Debug for DataIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataIn")
            .field("path", &self.path)
            .field("cached", &self.cache.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(build: impl FnOnce(&mut Section)) -> DataIn {
        let mut root = Section::new();
        build(&mut root);
        DataIn::new(&TypeRegistry::with_builtins(), root)
    }

    #[test]
    fn scalar_widening_matrix() {
        let data = data(|root| {
            root.set("one", 1).set("half", 0.5).set("big", i64::MAX);
        });

        assert_eq!(data.read::<i64>("one").unwrap(), Some(1));
        assert_eq!(data.read::<i32>("one").unwrap(), Some(1));
        assert_eq!(data.read::<f64>("one").unwrap(), Some(1.0));
        assert_eq!(data.read::<f32>("one").unwrap(), Some(1.0));
        assert_eq!(data.read::<f64>("half").unwrap(), Some(0.5));
        assert_eq!(data.read::<f32>("half").unwrap(), Some(0.5));

        assert!(matches!(
            data.read::<i64>("half"),
            Err(DataError::WrongType { .. })
        ));
        assert!(matches!(
            data.read::<String>("one"),
            Err(DataError::WrongType { .. })
        ));
        assert!(matches!(
            data.read::<i32>("big"),
            Err(DataError::WrongType { .. })
        ));
        assert!(matches!(
            data.read::<bool>("missing"),
            Err(DataError::MissingData { .. })
        ));
    }

    #[test]
    fn null_reads_as_none_for_every_type() {
        let data = data(|root| {
            root.set_null("empty");
        });
        assert_eq!(data.read::<i64>("empty").unwrap(), None);
        assert_eq!(data.read::<String>("empty").unwrap(), None);
        assert!(data.read::<Value>("empty").unwrap().is_none());
        assert!(data
            .read_object("empty", &ObjectType::array_of(Expected::Any))
            .unwrap()
            .is_none());
    }

    #[test]
    fn fallback_reads() {
        let data = data(|root| {
            root.set("name", "bob").set_null("empty");
        });
        assert_eq!(data.read_or("age", 7i64).unwrap(), 7);
        assert_eq!(data.read_or("name", 7i64).unwrap(), 7);
        assert_eq!(data.read_or("empty", 7i64).unwrap(), 7);
        assert_eq!(data.read_or("name", String::new()).unwrap(), "bob");
    }

    #[test]
    fn strict_accessors() {
        let data = data(|root| {
            root.set("n", 5).set("f", 2.5).set("t", "__#9").set("b", true);
        });
        assert_eq!(data.read_i64("n").unwrap(), 5);
        assert_eq!(data.read_i32("n").unwrap(), 5);
        assert_eq!(data.read_f64("n").unwrap(), 5.0);
        assert_eq!(data.read_f32("f").unwrap(), 2.5);
        assert!(data.read_bool("b").unwrap());
        assert_eq!(data.read_string("t").unwrap(), "__#9");

        assert_eq!(data.read_i64_or("f", -1), -1);
        assert_eq!(data.read_i32_or("missing", 3), 3);
        assert_eq!(data.read_f64_or("t", 1.5), 1.5);
        assert!(!data.read_bool_or("n", false));
        assert_eq!(data.read_string_or("n", "none"), "none");
    }

    #[test]
    fn marker_text_is_an_object_reference() {
        let data = data(|root| {
            root.set("t", "__#9");
        });
        assert_eq!(data.read::<String>("t").unwrap().as_deref(), Some("__#9"));
        // Any other request resolves the marker, which has no index here.
        assert!(matches!(
            data.read::<Value>("t"),
            Err(DataError::InvalidData(_))
        ));
    }

    #[test]
    fn sections_are_cached_cursors() {
        let data = data(|root| {
            root.create_section("inner").set("x", 1);
        });
        let first = data.read_section("inner").unwrap();
        let second = data.read_section("inner").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.read::<i64>("x").unwrap(), Some(1));
        assert_eq!(first.path(), ["inner".to_owned()]);
        assert!(matches!(
            data.read::<i64>("inner"),
            Err(DataError::WrongType { .. })
        ));
    }

    #[test]
    fn read_section_rejects_null() {
        let data = data(|root| {
            root.set_null("gone");
        });
        assert!(matches!(
            data.read_section("gone"),
            Err(DataError::WrongType { .. })
        ));
    }

    #[test]
    fn unknown_class_is_invalid_data() {
        let data = data(|root| {
            root.create_section("x")
                .set(CLASSNAME_KEY, "NoSuchType")
                .set(ID_KEY, "__#1");
        });
        assert!(matches!(
            data.read::<Value>("x"),
            Err(DataError::InvalidData(_))
        ));
    }

    #[test]
    fn object_without_id_is_invalid_data() {
        let data = data(|root| {
            root.create_section("x").set(CLASSNAME_KEY, "List");
        });
        assert!(matches!(
            data.read::<Value>("x"),
            Err(DataError::InvalidData(_))
        ));
    }

    #[test]
    fn branching_index_is_invalid_data() {
        let data = data(|root| {
            root.set("r", "__#1");
            let index = root.create_section("__#1");
            index.create_section("a");
            index.create_section("b");
        });
        assert!(matches!(
            data.read::<Value>("r"),
            Err(DataError::InvalidData(_))
        ));
    }

    #[test]
    fn keys_and_kinds() {
        let data = data(|root| {
            root.set("a", 1).set("b", "x");
        });
        assert_eq!(data.keys(), vec!["a".to_owned(), "b".to_owned()]);
        assert!(data.has("a"));
        assert!(!data.has("c"));
        assert_eq!(data.kind_of("b"), Some(ValueKind::Text));
    }
}
