//! Hierarchy-aware dispatch from runtime types to converters.
//!
//! Lookup order for a named type, first match wins:
//!
//! 1. an exact registration;
//! 2. each concrete ancestor, nearest first;
//! 3. for the type and then each ancestor: its directly declared interfaces
//!    in declaration order, then (depth first) the interfaces those extend.
//!
//! Arrays never take part: every array type goes to the array converter.
//! Results are memoized per requested type and the memo is dropped on every
//! mutation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::converter::Converter;
use crate::creator::Allocator;
use crate::types::{Expected, ObjectType, TypeInfo};

/// A registered type paired with the converter covering it.
#[derive(Clone)]
pub struct ConverterEntry {
    pub type_info: &'static TypeInfo,
    pub converter: Arc<dyn Converter>,
}

impl fmt::Debug for ConverterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterEntry")
            .field("type_info", &self.type_info.name)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryInner {
    converters: HashMap<&'static str, ConverterEntry>,
    cache: HashMap<&'static str, Option<Arc<dyn Converter>>>,
    /// Names loadable on decode.
    types: HashMap<&'static str, &'static TypeInfo>,
    allocators: HashMap<&'static str, Arc<Allocator>>,
    array_converter: Option<Arc<dyn Converter>>,
}

impl RegistryInner {
    fn declare(&mut self, info: &'static TypeInfo) {
        if self.types.insert(info.name, info).is_some() {
            return;
        }
        if let Some(parent) = info.parent {
            self.declare(parent);
        }
        for iface in info.interfaces {
            self.declare(iface);
        }
    }

    fn exact(&self, info: &TypeInfo) -> Option<Arc<dyn Converter>> {
        self.converters
            .get(info.name)
            .map(|entry| Arc::clone(&entry.converter))
    }

    fn find(&self, info: &'static TypeInfo) -> Option<Arc<dyn Converter>> {
        if let Some(found) = self.exact(info) {
            return Some(found);
        }
        for ancestor in info.ancestors() {
            if let Some(found) = self.exact(ancestor) {
                return Some(found);
            }
        }
        std::iter::once(info)
            .chain(info.ancestors())
            .find_map(|level| self.find_interface(level))
    }

    fn find_interface(&self, info: &'static TypeInfo) -> Option<Arc<dyn Converter>> {
        let interfaces = info.interfaces.iter().copied();
        interfaces
            .clone()
            .find_map(|iface| self.exact(iface))
            .or_else(|| interfaces.clone().find_map(|iface| self.find_interface(iface)))
    }
}

/// Shared converter table.
///
/// Cheap to clone: every clone is a handle onto the same table, so a single
/// registry built at startup can be handed to each encode and decode.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl TypeRegistry {
    /// An empty registry with no converters at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in converters.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::builtins::install(&registry);
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            log::debug!("type registry lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            log::debug!("type registry lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Maps `info` (and by extension its subtypes) to `converter`, returning
    /// the entry it replaced.
    pub fn register<C>(&self, info: &'static TypeInfo, converter: C) -> Option<ConverterEntry>
    where
        C: Converter + 'static,
    {
        self.register_shared(info, Arc::new(converter))
    }

    pub fn register_shared(
        &self,
        info: &'static TypeInfo,
        converter: Arc<dyn Converter>,
    ) -> Option<ConverterEntry> {
        log::debug!("registering converter for `{}`", info.name);
        let mut inner = self.write();
        inner.cache.clear();
        inner.declare(info);
        inner.converters.insert(
            info.name,
            ConverterEntry {
                type_info: info,
                converter,
            },
        )
    }

    pub fn unregister(&self, info: &TypeInfo) -> Option<ConverterEntry> {
        log::debug!("unregistering converter for `{}`", info.name);
        let mut inner = self.write();
        inner.cache.clear();
        inner.converters.remove(info.name)
    }

    /// Installs the converter every array type resolves to.
    pub fn register_array<C>(&self, converter: C)
    where
        C: Converter + 'static,
    {
        log::debug!("registering array converter");
        let mut inner = self.write();
        inner.array_converter = Some(Arc::new(converter));
    }

    /// Makes `info` (with its ancestors and interfaces) loadable by name when
    /// decoding, without giving it a converter of its own.
    pub fn register_type(&self, info: &'static TypeInfo) {
        self.write().declare(info);
    }

    /// Registers the placeholder allocator of a self-describing type.
    pub fn register_allocator(&self, info: &'static TypeInfo, allocator: Allocator) {
        log::debug!("registering allocator for `{}`", info.name);
        let mut inner = self.write();
        inner.declare(info);
        inner.allocators.insert(info.name, Arc::new(allocator));
    }

    pub fn allocator(&self, info: &TypeInfo) -> Option<Arc<Allocator>> {
        self.read().allocators.get(info.name).cloned()
    }

    /// Converter responsible for `object_type`, if any. A named type that
    /// resolves is declared as well, so whatever can be encoded through this
    /// registry can also be decoded by name.
    pub fn resolve(&self, object_type: &ObjectType) -> Option<Arc<dyn Converter>> {
        let info = match object_type {
            ObjectType::Array(_) => return self.read().array_converter.clone(),
            ObjectType::Named(info) => *info,
        };
        {
            let inner = self.read();
            if let Some(cached) = inner.cache.get(info.name) {
                return cached.clone();
            }
        }
        let mut inner = self.write();
        let found = inner.find(info);
        if found.is_some() {
            inner.declare(info);
        }
        inner.cache.insert(info.name, found.clone());
        found
    }

    /// Parses a `__classname` back into a type. Array names (`"[i64]"`,
    /// `"[[Pet]]"`) are parsed recursively; named types must have been
    /// registered or declared.
    pub fn resolve_name(&self, name: &str) -> Option<ObjectType> {
        if let Some(element) = name.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            let element = match Expected::scalar_from_name(element) {
                Some(scalar) => scalar,
                None => Expected::Object(self.resolve_name(element)?),
            };
            return Some(ObjectType::array_of(element));
        }
        self.read().types.get(name).copied().map(ObjectType::Named)
    }

    /// `true` when exactly `info` has its own converter.
    pub fn contains(&self, info: &TypeInfo) -> bool {
        self.read().converters.contains_key(info.name)
    }

    /// Number of exact registrations.
    pub fn len(&self) -> usize {
        self.read().converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().converters.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        let mut names: Vec<_> = inner.converters.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("converters", &names)
            .field("array", &inner.array_converter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DataIn;
    use crate::encoder::DataOut;
    use crate::error::DataError;
    use crate::object::ObjectRef;

    //           Alive                   Falloffable
    //             |                          |
    //           Animal          Thing    Mountable
    //    +--------+-------+         |    |
    //   Moose   Squid   Horse ---> Rideable
    static ALIVE: TypeInfo = TypeInfo::interface("Alive");
    static FALLOFFABLE: TypeInfo = TypeInfo::interface("Falloffable");
    static MOUNTABLE: TypeInfo = TypeInfo::interface("Mountable").implements(&[&FALLOFFABLE]);
    static THING: TypeInfo = TypeInfo::interface("Thing");
    static RIDEABLE: TypeInfo = TypeInfo::interface("Rideable").implements(&[&THING]);
    static ANIMAL: TypeInfo = TypeInfo::class("Animal").implements(&[&ALIVE]);
    static SQUID: TypeInfo = TypeInfo::class("Squid").extends(&ANIMAL);
    static MOOSE: TypeInfo = TypeInfo::class("Moose").extends(&ANIMAL);
    static HORSE: TypeInfo = TypeInfo::class("Horse")
        .extends(&ANIMAL)
        .implements(&[&RIDEABLE, &MOUNTABLE]);

    struct Tag(&'static str);

    impl Converter for Tag {
        fn serialize(&self, _: &ObjectRef, _: &mut DataOut<'_>) -> Result<(), DataError> {
            Err(DataError::custom(self.0))
        }

        fn create(&self, _: &DataIn, _: &ObjectType) -> Result<ObjectRef, DataError> {
            Err(DataError::custom(self.0))
        }

        fn initialise(&self, _: &DataIn, _: &ObjectRef) -> Result<(), DataError> {
            Err(DataError::custom(self.0))
        }
    }

    /// Identifies a resolved converter by the message its `create` fails with.
    fn tag_of(registry: &TypeRegistry, info: &'static TypeInfo) -> Option<String> {
        let converter = registry.resolve(&ObjectType::Named(info))?;
        let data = DataIn::new(registry, crate::tree::Section::new());
        match converter.create(&data, &ObjectType::Named(info)) {
            Err(err) => Some(err.to_string()),
            Ok(_) => None,
        }
    }

    fn registry(entries: &[(&'static TypeInfo, &'static str)]) -> TypeRegistry {
        let registry = TypeRegistry::new();
        for &(info, tag) in entries {
            registry.register(info, Tag(tag));
        }
        registry
    }

    #[test]
    fn direct_registration() {
        let map = registry(&[(&SQUID, "squid"), (&MOOSE, "moose")]);
        assert_eq!(tag_of(&map, &SQUID).as_deref(), Some("squid"));
        assert_eq!(tag_of(&map, &MOOSE).as_deref(), Some("moose"));
        assert_eq!(tag_of(&map, &HORSE), None);
    }

    #[test]
    fn class_hierarchy_fallback() {
        let map = registry(&[(&SQUID, "squid"), (&ANIMAL, "animal")]);
        assert_eq!(tag_of(&map, &SQUID).as_deref(), Some("squid"));
        assert_eq!(tag_of(&map, &MOOSE).as_deref(), Some("animal"));
    }

    #[test]
    fn interface_hierarchy_fallback() {
        let map = registry(&[(&SQUID, "squid"), (&RIDEABLE, "rideable")]);
        assert_eq!(tag_of(&map, &SQUID).as_deref(), Some("squid"));
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("rideable"));
    }

    #[test]
    fn class_hierarchy_before_interfaces() {
        let map = registry(&[(&RIDEABLE, "rideable"), (&ANIMAL, "animal")]);
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("animal"));
    }

    #[test]
    fn direct_interface_before_inherited_interface() {
        let map = registry(&[(&RIDEABLE, "rideable"), (&THING, "thing")]);
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("rideable"));
    }

    #[test]
    fn earlier_interface_chain_wins() {
        let map = registry(&[(&FALLOFFABLE, "fall"), (&THING, "thing")]);
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("thing"));
    }

    #[test]
    fn own_interfaces_before_parent_interfaces() {
        let map = registry(&[(&FALLOFFABLE, "fall"), (&ALIVE, "alive")]);
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("fall"));
        assert_eq!(tag_of(&map, &SQUID).as_deref(), Some("alive"));
    }

    #[test]
    fn register_invalidates_cache() {
        let map = registry(&[(&ANIMAL, "animal")]);
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("animal"));

        let replaced = map.register(&HORSE, Tag("horse"));
        assert!(replaced.is_none());
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("horse"));

        let replaced = map.register(&HORSE, Tag("horse2"));
        assert_eq!(replaced.map(|entry| entry.type_info.name), Some("Horse"));
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("horse2"));

        map.unregister(&HORSE);
        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("animal"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn arrays_resolve_to_array_converter() {
        let map = registry(&[(&ANIMAL, "animal")]);
        let ints = ObjectType::array_of(Expected::Integer);
        assert!(map.resolve(&ints).is_none());

        map.register_array(Tag("array"));
        let horses = ObjectType::array_of(Expected::named(&HORSE));
        assert!(map.resolve(&ints).is_some());
        assert!(map.resolve(&horses).is_some());
    }

    #[test]
    fn names_resolve_after_declaration() {
        let map = registry(&[(&ANIMAL, "animal")]);
        assert!(map.resolve_name("Horse").is_none());

        map.register_type(&HORSE);
        assert_eq!(map.resolve_name("Horse"), Some(ObjectType::Named(&HORSE)));
        assert_eq!(map.resolve_name("Thing"), Some(ObjectType::Named(&THING)));
        assert_eq!(
            map.resolve_name("[[Horse]]"),
            Some(ObjectType::array_of(Expected::Object(ObjectType::array_of(
                Expected::named(&HORSE)
            ))))
        );
        assert_eq!(
            map.resolve_name("[f64]"),
            Some(ObjectType::array_of(Expected::Float))
        );
        assert!(map.resolve_name("[Zebra]").is_none());
    }

    #[test]
    fn resolving_declares_the_type() {
        let map = registry(&[(&RIDEABLE, "rideable")]);
        assert!(map.resolve_name("Horse").is_none());
        assert!(map.resolve(&ObjectType::Named(&SQUID)).is_none());
        assert!(map.resolve_name("Squid").is_none());

        assert_eq!(tag_of(&map, &HORSE).as_deref(), Some("rideable"));
        assert_eq!(map.resolve_name("Horse"), Some(ObjectType::Named(&HORSE)));
        assert_eq!(map.resolve_name("Animal"), Some(ObjectType::Named(&ANIMAL)));
    }

    #[test]
    fn clones_share_one_table() {
        let map = TypeRegistry::new();
        let handle = map.clone();
        handle.register(&SQUID, Tag("squid"));
        assert!(map.contains(&SQUID));
        assert!(!map.contains(&ANIMAL));
    }
}
