//! Built-in types and the converters that [`TypeRegistry::with_builtins`]
//! installs for them.
//!
//! | type | wire name | converter |
//! |------|-----------|-----------|
//! | [`Serializable`] implementors | their own | [`SerializableConverter`] |
//! | [`List`], [`ValueSet`] | `List`, `Set` and subtypes | [`CollectionConverter`] |
//! | [`ValueMap`] | `Map` and subtypes | [`MapConverter`] |
//! | [`EnumValue`] | subtypes of `Enum` | [`EnumConverter`] |
//! | [`TypeToken`] | `Type` | [`TypeTokenConverter`] |
//! | [`Boxed`] | `Boolean`, `Integer`, ... | [`BoxedConverter`] |
//! | [`Array`] | `[<element>]` | [`ArrayConverter`] |

mod array;
mod boxed;
mod collection;
mod enumeration;
mod map;
mod serializable;
mod type_token;

use crate::registry::TypeRegistry;

pub use array::{Array, ArrayConverter};
pub use boxed::{
    Boxed, BoxedConverter, BoxedScalar, BOOLEAN, BYTE, CHARACTER, DOUBLE, FLOAT, INTEGER, LONG,
    SHORT,
};
pub use collection::{CollectionConverter, List, ValueSet, COLLECTION, LIST, SET};
pub use enumeration::{EnumConverter, EnumValue, GraphEnum, ENUM};
pub use map::{MapConverter, ValueMap, MAP};
pub use serializable::{Serializable, SerializableConverter, SERIALIZABLE};
pub use type_token::{TypeToken, TypeTokenConverter, TYPE_TOKEN};

pub(crate) fn install(registry: &TypeRegistry) {
    registry.register(&SERIALIZABLE, SerializableConverter);
    registry.register(&COLLECTION, CollectionConverter);
    registry.register_type(&LIST);
    registry.register_type(&SET);
    registry.register(&MAP, MapConverter);
    registry.register(&ENUM, EnumConverter);
    registry.register(&TYPE_TOKEN, TypeTokenConverter);
    boxed::install(registry);
    registry.register_array(ArrayConverter);
}
