//! Object-graph serialization into a primitive value tree.
//!
//! Typed object graphs, including cyclic ones and graphs that share objects,
//! are flattened into a [`Section`] tree of scalars and nested sections, and
//! rebuilt from one:
//!
//! - [`TypeRegistry`] maps a runtime type to its [`Converter`], falling back
//!   through declared ancestors and interfaces.
//! - [`Encoder`] writes objects through [`DataOut`] cursors. Every object's
//!   data is stored exactly once, at the shallowest site referring to it;
//!   other sites hold a `"__#<n>"` marker resolved through a root-level
//!   location index.
//! - [`DataIn`] reads objects back with two-phase construction, registering
//!   each placeholder under its identity before populating it so references
//!   back into an unfinished object resolve to that same instance.
//!
//! Byte-level formats live outside this crate (see `graph-data-codec`).
//!
//! ```
//! use graph_data::{DataIn, Encoder, TypeRegistry};
//!
//! let registry = TypeRegistry::with_builtins();
//! let mut encoder = Encoder::new(&registry);
//! encoder.write("one", 1).unwrap().write("half", 0.5).unwrap();
//!
//! let data = DataIn::new(&registry, encoder.into_tree());
//! assert_eq!(data.read::<f64>("one").unwrap(), Some(1.0));
//! assert_eq!(data.read::<f64>("half").unwrap(), Some(0.5));
//! ```

pub mod builtins;
pub mod constants;
pub mod converter;
pub mod creator;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod object;
pub mod registry;
pub mod tree;
pub mod types;
pub mod value;

pub use builtins::{
    Array, Boxed, BoxedScalar, EnumValue, GraphEnum, List, Serializable, TypeToken, ValueMap,
    ValueSet,
};
pub use converter::Converter;
pub use creator::Allocator;
pub use decoder::DataIn;
pub use encoder::{DataOut, Encoder};
pub use error::DataError;
pub use object::{downcast_rc, Object, ObjectRef, Typed};
pub use registry::{ConverterEntry, TypeRegistry};
pub use tree::{PrimitiveValue, Section, ValueKind};
pub use types::{Expected, ObjectType, TypeInfo, TypeKind};
pub use value::{Readable, Value};

/// Default bound on object nesting, for both encoding and decoding.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Resource bounds of one encode or decode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Deepest section an encoder may create, and the most objects a decoder
    /// may have under construction at once. Exceeding it fails with
    /// [`DataError::InvalidData`] rather than exhausting the stack.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
