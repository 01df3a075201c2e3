//! Write side: object graph to primitive tree.
//!
//! Cursors address their section by path from the root rather than holding a
//! reference into the tree, because writing a shared object may move an
//! already written subtree to a shallower site.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::constants::{marker, CLASSNAME_KEY, ID_KEY};
use crate::error::DataError;
use crate::object::{address, ObjectRef};
use crate::registry::TypeRegistry;
use crate::tree::{PrimitiveValue, Section};
use crate::value::Value;
use crate::Limits;

/// Bookkeeping for an object already written in this operation.
struct Record {
    marker: String,
    /// Keys from the root to the section holding the object's data.
    path: Vec<String>,
    /// Keeps the allocation alive so its address cannot be reused by another
    /// object before the operation ends.
    _object: ObjectRef,
}

struct EncodeState {
    root: Section,
    records: HashMap<usize, Record>,
    next_token: u64,
    limits: Limits,
}

/// Root of one encode operation.
pub struct Encoder {
    registry: TypeRegistry,
    state: EncodeState,
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("objects", &self.state.records.len())
            .field("next_token", &self.state.next_token)
            .field("limits", &self.state.limits)
            .finish_non_exhaustive()
    }
}

impl Encoder {
    pub fn new(registry: &TypeRegistry) -> Self {
        Self {
            registry: registry.clone(),
            state: EncodeState {
                root: Section::new(),
                records: HashMap::new(),
                next_token: 1,
                limits: Limits::default(),
            },
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.state.limits = limits;
        self
    }

    /// Write cursor over the root section.
    pub fn root(&mut self) -> DataOut<'_> {
        DataOut {
            registry: &self.registry,
            state: &mut self.state,
            path: Vec::new(),
        }
    }

    pub fn write(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, DataError> {
        self.root().write(key, value)?;
        Ok(self)
    }

    pub fn create_section(&mut self, key: impl Into<String>) -> Result<DataOut<'_>, DataError> {
        self.root().into_child(key.into())
    }

    /// Independent deep copy of everything written so far.
    pub fn snapshot(&self) -> Section {
        self.state.root.copy()
    }

    pub fn into_tree(self) -> Section {
        self.state.root
    }
}

/// Write cursor scoped to one section of an encode operation.
pub struct DataOut<'a> {
    registry: &'a TypeRegistry,
    state: &'a mut EncodeState,
    path: Vec<String>,
}

impl<'a> DataOut<'a> {
    /// Keys from the root to this cursor's section.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Depth of this cursor's section; the root is 0.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Writes `value` under `key`.
    ///
    /// Scalars and `Null` are stored directly. Objects go through the
    /// registry; an object already written in this operation is stored once
    /// and referenced by marker everywhere else.
    pub fn write(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, DataError> {
        let key = key.into();
        match value.into() {
            Value::Null => {
                self.section()?.set_null(key);
            }
            Value::Bool(v) => {
                self.section()?.set(key, v);
            }
            Value::Integer(v) => {
                self.section()?.set(key, v);
            }
            Value::Float(v) => {
                self.section()?.set(key, v);
            }
            Value::Text(v) => {
                self.section()?.set(key, v);
            }
            Value::Object(object) => self.write_object(key, object)?,
            Value::Section(_) => {
                return Err(DataError::invalid(format!(
                    "cannot write a decode cursor to `{key}`"
                )))
            }
        }
        Ok(self)
    }

    /// Creates an empty plain section under `key` and returns its cursor.
    pub fn create_section(&mut self, key: impl Into<String>) -> Result<DataOut<'_>, DataError> {
        self.open_section(key.into())
    }

    fn open_section(&mut self, key: String) -> Result<DataOut<'_>, DataError> {
        DataOut {
            registry: self.registry,
            state: &mut *self.state,
            path: self.path.clone(),
        }
        .into_child(key)
    }

    fn into_child(mut self, key: String) -> Result<DataOut<'a>, DataError> {
        self.check_depth(&key)?;
        self.section()?.create_section(key.as_str());
        self.path.push(key);
        Ok(self)
    }

    fn check_depth(&self, key: &str) -> Result<(), DataError> {
        let max = self.state.limits.max_depth;
        if self.path.len() >= max {
            return Err(DataError::invalid(format!(
                "section `{key}` would exceed the maximum nesting depth of {max}"
            )));
        }
        Ok(())
    }

    fn section(&mut self) -> Result<&mut Section, DataError> {
        let path = &self.path;
        self.state
            .root
            .section_at_mut(path)
            .ok_or_else(|| DataError::invalid(format!("write cursor at {path:?} is detached")))
    }

    fn write_object(&mut self, key: String, object: ObjectRef) -> Result<(), DataError> {
        let id = address(&object);
        if let Some(record) = self.state.records.get(&id) {
            // Depth the data would have if stored here. An equal depth keeps
            // the data at the first site; only a strictly shallower site
            // takes it over.
            let site_depth = self.path.len() + 1;
            if record.path.len() <= site_depth {
                let marker = record.marker.clone();
                let location = record.path.clone();
                self.section()?.set(key, marker.as_str());
                if !self.state.root.contains(&marker) {
                    write_index(&mut self.state.root, &marker, &location);
                }
            } else {
                self.relocate(id, key)?;
            }
            return Ok(());
        }

        let object_type = object.object_type();
        let type_name = object_type.name();
        let converter = self.registry.resolve(&object_type).ok_or_else(|| {
            DataError::invalid(format!("no converter registered for `{type_name}`"))
        })?;
        self.check_depth(&key)?;

        let token = marker(self.state.next_token);
        self.state.next_token += 1;
        self.section()?
            .create_section(key.as_str())
            .set(CLASSNAME_KEY, type_name.as_str())
            .set(ID_KEY, token.as_str());

        let mut path = self.path.clone();
        path.push(key);
        log::trace!("serializing `{type_name}` as {token} at {path:?}");
        self.state.records.insert(
            id,
            Record {
                marker: token,
                path: path.clone(),
                _object: Rc::clone(&object),
            },
        );

        let mut nested = DataOut {
            registry: self.registry,
            state: &mut *self.state,
            path,
        };
        converter
            .serialize(&object, &mut nested)
            .map_err(|err| DataError::serialization(type_name, err))
    }

    /// Moves the data of the object recorded under `id` to `key` of this
    /// cursor, leaving its marker in the old slot.
    fn relocate(&mut self, id: usize, key: String) -> Result<(), DataError> {
        let (token, old_path) = match self.state.records.get(&id) {
            Some(record) => (record.marker.clone(), record.path.clone()),
            None => return Ok(()),
        };
        let (old_key, old_parent) = match old_path.split_last() {
            Some(split) => split,
            None => return Err(DataError::invalid("object recorded at the root section")),
        };
        let detached = self
            .state
            .root
            .section_at_mut(old_parent)
            .and_then(|parent| {
                parent.insert(old_key.as_str(), PrimitiveValue::Text(token.clone()))
            });
        let data = match detached {
            Some(PrimitiveValue::Section(data)) => data,
            _ => {
                return Err(DataError::invalid(format!(
                    "data of {token} is missing from {old_path:?}"
                )))
            }
        };
        self.section()?.insert(key.as_str(), PrimitiveValue::Section(data));

        let mut new_path = self.path.clone();
        new_path.push(key);
        log::debug!("hoisting {token} from {old_path:?} to {new_path:?}");

        // Rebase the moved object and everything recorded inside it.
        let root = &mut self.state.root;
        for record in self.state.records.values_mut() {
            if !record.path.starts_with(&old_path) {
                continue;
            }
            let mut rebased = new_path.clone();
            rebased.extend_from_slice(&record.path[old_path.len()..]);
            record.path = rebased;
            if record.marker == token || root.contains(&record.marker) {
                write_index(root, &record.marker, &record.path);
            }
        }
        Ok(())
    }
}

/// (Re)writes the root-level location index of `marker`: a chain of empty
/// sections whose keys spell out `path`.
fn write_index(root: &mut Section, marker: &str, path: &[String]) {
    let mut section = root.create_section(marker);
    for key in path {
        section = section.create_section(key.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Converter;
    use crate::decoder::DataIn;
    use crate::object::downcast_rc;
    use crate::types::{ObjectType, TypeInfo};
    use std::cell::RefCell;

    static NODE: TypeInfo = TypeInfo::class("Node");

    #[derive(Default)]
    struct Node {
        next: RefCell<Option<ObjectRef>>,
    }
    crate::impl_object!(Node => NODE);

    fn node(next: Option<ObjectRef>) -> ObjectRef {
        Rc::new(Node {
            next: RefCell::new(next),
        })
    }

    struct NodeConverter;

    impl Converter for NodeConverter {
        fn serialize(&self, object: &ObjectRef, out: &mut DataOut<'_>) -> Result<(), DataError> {
            let node = downcast_rc::<Node>(object).ok_or_else(|| DataError::custom("not a node"))?;
            let next = node.next.borrow().clone();
            out.write("next", next.map(Value::Object))?;
            Ok(())
        }

        fn create(&self, _: &DataIn, _: &ObjectType) -> Result<ObjectRef, DataError> {
            Ok(Rc::new(Node::default()))
        }

        fn initialise(&self, _: &DataIn, _: &ObjectRef) -> Result<(), DataError> {
            Ok(())
        }
    }

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry.register(&NODE, NodeConverter);
        registry
    }

    #[test]
    fn scalars_and_null_are_stored_directly() {
        let registry = registry();
        let mut encoder = Encoder::new(&registry);
        encoder
            .write("i", 3)
            .unwrap()
            .write("f", 0.5)
            .unwrap()
            .write("s", "x")
            .unwrap()
            .write("b", true)
            .unwrap()
            .write("n", None::<i64>)
            .unwrap();
        let tree = encoder.into_tree();
        assert_eq!(tree.get_integer("i").unwrap(), 3);
        assert_eq!(tree.get_float("f").unwrap(), 0.5);
        assert_eq!(tree.get_text("s").unwrap(), "x");
        assert!(tree.get_bool("b").unwrap());
        assert_eq!(tree.get("n"), Some(&PrimitiveValue::Null));
    }

    #[test]
    fn object_section_carries_reserved_keys() {
        let registry = registry();
        let mut encoder = Encoder::new(&registry);
        encoder.write("n", Value::Object(node(None))).unwrap();
        let tree = encoder.into_tree();
        let data = tree.get_section("n").unwrap();
        assert_eq!(data.get_text(CLASSNAME_KEY).unwrap(), "Node");
        assert_eq!(data.get_text(ID_KEY).unwrap(), "__#1");
        assert_eq!(data.get("next"), Some(&PrimitiveValue::Null));
    }

    #[test]
    fn same_depth_reference_keeps_first_site() {
        let registry = registry();
        let shared = node(None);
        let mut encoder = Encoder::new(&registry);
        encoder
            .write("first", Value::Object(Rc::clone(&shared)))
            .unwrap()
            .write("second", Value::Object(shared))
            .unwrap();
        let tree = encoder.into_tree();
        assert!(tree.get_section("first").is_ok());
        assert_eq!(tree.get_text("second").unwrap(), "__#1");
        assert!(tree.section_at(&["__#1", "first"]).unwrap().is_empty());
    }

    #[test]
    fn shallower_reference_hoists_data() {
        let registry = registry();
        let shared = node(None);
        let holder = node(Some(Rc::clone(&shared)));
        let mut encoder = Encoder::new(&registry);
        encoder
            .write("holder", Value::Object(holder))
            .unwrap()
            .write("shared", Value::Object(shared))
            .unwrap();
        let tree = encoder.into_tree();

        assert_eq!(
            tree.get_section("shared").unwrap().get_text(ID_KEY).unwrap(),
            "__#2"
        );
        assert_eq!(
            tree.get_section("holder").unwrap().get_text("next").unwrap(),
            "__#2"
        );
        assert!(tree.section_at(&["__#2", "shared"]).unwrap().is_empty());
    }

    #[test]
    fn hoisting_rebases_nested_objects() {
        let registry = registry();
        let inner = node(None);
        let middle = node(Some(Rc::clone(&inner)));
        let outer = node(Some(Rc::clone(&middle)));
        let mut encoder = Encoder::new(&registry);
        encoder.write("outer", Value::Object(outer)).unwrap();
        // Hoisting middle carries inner along; inner must be found there.
        encoder.write("middle", Value::Object(middle)).unwrap();
        encoder.write("inner", Value::Object(inner)).unwrap();
        let tree = encoder.into_tree();

        assert_eq!(
            tree.get_section("middle").unwrap().get_text("next").unwrap(),
            "__#3"
        );
        assert_eq!(
            tree.get_section("inner").unwrap().get_text(ID_KEY).unwrap(),
            "__#3"
        );
        assert!(tree.section_at(&["__#3", "inner"]).unwrap().is_empty());
    }

    #[test]
    fn self_reference_writes_marker() {
        let registry = registry();
        let looped = Rc::new(Node::default());
        let handle: ObjectRef = looped.clone();
        *looped.next.borrow_mut() = Some(Rc::clone(&handle));
        let mut encoder = Encoder::new(&registry);
        encoder.write("loop", Value::Object(handle)).unwrap();
        let tree = encoder.into_tree();
        assert_eq!(
            tree.get_section("loop").unwrap().get_text("next").unwrap(),
            "__#1"
        );
        assert!(tree.section_at(&["__#1", "loop"]).is_some());
        looped.next.borrow_mut().take();
    }

    #[test]
    fn snapshot_is_independent() {
        let registry = registry();
        let mut encoder = Encoder::new(&registry);
        encoder.write("a", 1).unwrap();
        let snapshot = encoder.snapshot();
        encoder.write("a", 2).unwrap().write("b", 3).unwrap();
        assert_eq!(snapshot.get_integer("a").unwrap(), 1);
        assert!(!snapshot.contains("b"));
    }

    #[test]
    fn unknown_type_is_invalid_data() {
        static STRAY: TypeInfo = TypeInfo::class("Stray");
        struct Stray;
        crate::impl_object!(Stray => STRAY);

        let registry = registry();
        let mut encoder = Encoder::new(&registry);
        let stray: ObjectRef = Rc::new(Stray);
        let err = encoder.write("s", Value::Object(stray)).unwrap_err();
        assert!(matches!(err, DataError::InvalidData(_)));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let registry = registry();
        let mut chain = node(None);
        for _ in 0..40 {
            chain = node(Some(chain));
        }
        let mut encoder = Encoder::new(&registry).with_limits(Limits::new().max_depth(16));
        let err = encoder.write("chain", Value::Object(chain)).unwrap_err();
        let mut cause = &err;
        while let DataError::Serialization { source, .. } = cause {
            cause = &**source;
        }
        assert!(matches!(cause, DataError::InvalidData(_)));
    }

    #[test]
    fn plain_sections_nest() {
        let registry = registry();
        let mut encoder = Encoder::new(&registry);
        {
            let mut section = encoder.create_section("outer").unwrap();
            section.write("x", 1).unwrap();
            assert_eq!(section.depth(), 1);
            let mut inner = section.create_section("inner").unwrap();
            inner.write("y", 2).unwrap();
            assert_eq!(inner.path(), ["outer".to_owned(), "inner".to_owned()]);
        }
        let tree = encoder.into_tree();
        assert_eq!(
            tree.section_at(&["outer", "inner"]).unwrap().get_integer("y").unwrap(),
            2
        );
    }

    #[test]
    fn nodes_downcast_back() {
        let object = node(None);
        assert!(downcast_rc::<Node>(&object).is_some());
        assert_eq!(object.object_type().name(), "Node");
    }
}
