//! Static type descriptors and the requested-type model of reads.
//!
//! Rust has no class graph to introspect at runtime, so every object type
//! declares its concrete parent and its interfaces up front in a `'static`
//! [`TypeInfo`]. Registry lookup and decode-time assignability checks both
//! walk these declarations.

use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
}

/// Declared shape of a named object type.
///
/// ```
/// use graph_data::TypeInfo;
///
/// static ANIMAL: TypeInfo = TypeInfo::class("Animal");
/// static RIDEABLE: TypeInfo = TypeInfo::interface("Rideable");
/// static HORSE: TypeInfo = TypeInfo::class("Horse")
///     .extends(&ANIMAL)
///     .implements(&[&RIDEABLE]);
///
/// assert!(HORSE.is_subtype_of(&ANIMAL));
/// assert!(HORSE.is_subtype_of(&RIDEABLE));
/// ```
#[derive(Debug)]
pub struct TypeInfo {
    pub name: &'static str,
    pub kind: TypeKind,
    /// Concrete ancestor. Always `None` for interfaces.
    pub parent: Option<&'static TypeInfo>,
    /// Directly declared interfaces in declaration order. For an interface
    /// these are the interfaces it extends.
    pub interfaces: &'static [&'static TypeInfo],
    /// Variant names of an enumeration type.
    pub variants: &'static [&'static str],
}

impl TypeInfo {
    pub const fn class(name: &'static str) -> Self {
        Self {
            name,
            kind: TypeKind::Class,
            parent: None,
            interfaces: &[],
            variants: &[],
        }
    }

    pub const fn interface(name: &'static str) -> Self {
        Self {
            name,
            kind: TypeKind::Interface,
            parent: None,
            interfaces: &[],
            variants: &[],
        }
    }

    pub const fn extends(mut self, parent: &'static TypeInfo) -> Self {
        self.parent = Some(parent);
        self
    }

    pub const fn implements(mut self, interfaces: &'static [&'static TypeInfo]) -> Self {
        self.interfaces = interfaces;
        self
    }

    pub const fn with_variants(mut self, variants: &'static [&'static str]) -> Self {
        self.variants = variants;
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Concrete ancestors, nearest first, excluding `self`.
    pub fn ancestors(&self) -> impl Iterator<Item = &'static TypeInfo> {
        std::iter::successors(self.parent, |info| info.parent)
    }

    /// `true` when a value of type `self` may be used where `other` is
    /// expected: same type, a concrete ancestor, or any declared interface
    /// reachable from `self` or its ancestors.
    pub fn is_subtype_of(&self, other: &TypeInfo) -> bool {
        if self == other {
            return true;
        }
        if self.interfaces.iter().any(|i| i.is_subtype_of(other)) {
            return true;
        }
        match self.parent {
            Some(parent) => parent.is_subtype_of(other),
            None => false,
        }
    }

    pub fn variant_index(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| *v == name)
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Runtime type of an object: a named type or an array of some element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Named(&'static TypeInfo),
    Array(Box<Expected>),
}

impl ObjectType {
    pub fn array_of(element: Expected) -> Self {
        ObjectType::Array(Box::new(element))
    }

    /// Wire name written to `__classname`.
    pub fn name(&self) -> String {
        match self {
            ObjectType::Named(info) => info.name.to_owned(),
            ObjectType::Array(element) => format!("[{}]", element.type_name()),
        }
    }

    pub fn info(&self) -> Option<&'static TypeInfo> {
        match self {
            ObjectType::Named(info) => Some(info),
            ObjectType::Array(_) => None,
        }
    }

    /// `true` when a value of type `actual` may be stored in a slot of
    /// type `self`.
    pub fn accepts(&self, actual: &ObjectType) -> bool {
        match (self, actual) {
            (ObjectType::Named(want), ObjectType::Named(have)) => have.is_subtype_of(want),
            (ObjectType::Array(want), ObjectType::Array(have)) => match (&**want, &**have) {
                (Expected::Any, _) => true,
                (Expected::Object(w), Expected::Object(h)) => w.accepts(h),
                (w, h) => w == h,
            },
            _ => false,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Type requested by a read, or declared as an array's element type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expected {
    Any,
    Bool,
    Integer,
    Float,
    Text,
    Section,
    Object(ObjectType),
}

impl Expected {
    pub fn named(info: &'static TypeInfo) -> Self {
        Expected::Object(ObjectType::Named(info))
    }

    pub fn type_name(&self) -> String {
        match self {
            Expected::Any => "any".to_owned(),
            Expected::Bool => "bool".to_owned(),
            Expected::Integer => "i64".to_owned(),
            Expected::Float => "f64".to_owned(),
            Expected::Text => "str".to_owned(),
            Expected::Section => "section".to_owned(),
            Expected::Object(object) => object.name(),
        }
    }

    /// Parses a name produced by [`Expected::type_name`] for the scalar
    /// cases. Object names are resolved by the registry.
    pub fn scalar_from_name(name: &str) -> Option<Self> {
        match name {
            "any" => Some(Expected::Any),
            "bool" => Some(Expected::Bool),
            "i64" => Some(Expected::Integer),
            "f64" => Some(Expected::Float),
            "str" => Some(Expected::Text),
            "section" => Some(Expected::Section),
            _ => None,
        }
    }

    pub fn accepts_object(&self, actual: &ObjectType) -> bool {
        match self {
            Expected::Any => true,
            Expected::Object(want) => want.accepts(actual),
            _ => false,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}
