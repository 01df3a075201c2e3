//! Dynamic object handles.
//!
//! Every value that travels the object-graph path (anything that is not a
//! primitive scalar) is an [`ObjectRef`]. Identity is the `Rc` allocation, so
//! two handles to one allocation are the same object for encode and decode.

use std::any::Any;
use std::rc::Rc;

use crate::builtins::Serializable;
use crate::types::ObjectType;

pub trait Object: Any {
    /// Concrete runtime type, used for converter lookup and `__classname`.
    fn object_type(&self) -> ObjectType;

    /// Provides access to the dynamic type used for downcasting.
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;

    /// Returns the [`Serializable`] view if the type bundles itself.
    ///
    /// Defaults to `None`.
    fn as_serializable(&self) -> Option<&dyn Serializable> {
        None
    }
}

pub type ObjectRef = Rc<dyn Object>;

/// Object types whose runtime type is known statically.
pub trait Typed: Object + Sized {
    fn static_type() -> ObjectType;
}

/// Recovers the concrete handle behind `object`.
pub fn downcast_rc<T: Object>(object: &ObjectRef) -> Option<Rc<T>> {
    Rc::clone(object).into_any().downcast::<T>().ok()
}

/// Stable identity of an object handle for the duration of one operation.
pub(crate) fn address(object: &ObjectRef) -> usize {
    Rc::as_ptr(object) as *const () as usize
}

/// Implements [`Object`] and [`Typed`] for a named type.
///
/// Append `, serializable` when the type also implements
/// [`Serializable`](crate::Serializable) and should be dispatched through it.
#[macro_export]
macro_rules! impl_object {
    (@impl $ty:ty => $info:path, { $($extra:tt)* }) => {
        impl $crate::Object for $ty {
            fn object_type(&self) -> $crate::ObjectType {
                $crate::ObjectType::Named(&$info)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<dyn ::std::any::Any> {
                self
            }

            $($extra)*
        }

        impl $crate::Typed for $ty {
            fn static_type() -> $crate::ObjectType {
                $crate::ObjectType::Named(&$info)
            }
        }
    };
    ($ty:ty => $info:path) => {
        $crate::impl_object!(@impl $ty => $info, {});
    };
    ($ty:ty => $info:path, serializable) => {
        $crate::impl_object!(@impl $ty => $info, {
            fn as_serializable(&self) -> ::core::option::Option<&dyn $crate::Serializable> {
                ::core::option::Option::Some(self)
            }
        });
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInfo;

    static PLAIN: TypeInfo = TypeInfo::class("Plain");

    struct Plain;
    crate::impl_object!(Plain => PLAIN);

    struct Other;
    static OTHER: TypeInfo = TypeInfo::class("Other");
    crate::impl_object!(Other => OTHER);

    #[test]
    fn downcast_recovers_concrete_handle() {
        let object: ObjectRef = Rc::new(Plain);
        assert!(downcast_rc::<Plain>(&object).is_some());
        assert!(downcast_rc::<Other>(&object).is_none());
        assert_eq!(object.object_type().name(), "Plain");
        assert!(object.as_serializable().is_none());
    }

    #[test]
    fn address_follows_allocation() {
        let a: ObjectRef = Rc::new(Plain);
        let b = Rc::clone(&a);
        let c: ObjectRef = Rc::new(Plain);
        assert_eq!(address(&a), address(&b));
        assert_ne!(address(&a), address(&c));
    }
}
