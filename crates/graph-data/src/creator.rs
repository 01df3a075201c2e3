//! Placeholder allocation for self-describing types.
//!
//! Rust cannot allocate an instance without running any initializer, so the
//! placeholder is an ordinary default value whose fields sit behind interior
//! mutability. Completion then runs exactly one registered constructor.

use std::fmt;

use crate::decoder::DataIn;
use crate::error::DataError;
use crate::object::{downcast_rc, Object, ObjectRef};

type AllocateFn = Box<dyn Fn() -> ObjectRef + Send + Sync>;
type DataConstructorFn = Box<dyn Fn(&ObjectRef, &DataIn) -> Result<(), DataError> + Send + Sync>;
type EmptyConstructorFn = Box<dyn Fn(&ObjectRef) -> Result<(), DataError> + Send + Sync>;

pub struct Allocator {
    type_name: &'static str,
    allocate: AllocateFn,
    with_data: Option<DataConstructorFn>,
    empty: Option<EmptyConstructorFn>,
}

impl Allocator {
    /// Allocator producing `T` placeholders from `make`. At least one
    /// constructor must be attached before the allocator can complete an
    /// object.
    pub fn new<T: Object>(make: fn() -> T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            allocate: Box::new(move || -> ObjectRef { std::rc::Rc::new(make()) }),
            with_data: None,
            empty: None,
        }
    }

    /// Constructor that reads the decode cursor. Preferred when present.
    pub fn with_data_constructor<T: Object>(
        mut self,
        constructor: fn(&T, &DataIn) -> Result<(), DataError>,
    ) -> Self {
        let type_name = self.type_name;
        self.with_data = Some(Box::new(move |object, data| {
            let target = downcast_rc::<T>(object).ok_or_else(|| mismatch(type_name, object))?;
            constructor(&target, data)
        }));
        self
    }

    /// Zero-argument constructor, used when no data constructor exists.
    pub fn with_empty_constructor<T: Object>(mut self, constructor: fn(&T)) -> Self {
        let type_name = self.type_name;
        self.empty = Some(Box::new(move |object| {
            let target = downcast_rc::<T>(object).ok_or_else(|| mismatch(type_name, object))?;
            constructor(&target);
            Ok(())
        }));
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn allocate(&self) -> ObjectRef {
        (self.allocate)()
    }

    /// Runs the data constructor, or failing that the empty constructor.
    pub fn run_constructor(&self, object: &ObjectRef, data: &DataIn) -> Result<(), DataError> {
        if let Some(constructor) = &self.with_data {
            return constructor(object, data);
        }
        if let Some(constructor) = &self.empty {
            return constructor(object);
        }
        Err(DataError::custom(format!(
            "`{}` has no data constructor and no empty constructor",
            self.type_name
        )))
    }
}

fn mismatch(type_name: &str, object: &ObjectRef) -> DataError {
    DataError::custom(format!(
        "allocator for `{type_name}` handed an instance of `{}`",
        object.object_type()
    ))
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("type_name", &self.type_name)
            .field("with_data", &self.with_data.is_some())
            .field("empty", &self.empty.is_some())
            .finish()
    }
}
