// vim: tw=80
//! Type-erased argument values, replies, and default return values.

use downcast::{downcast, Any};
use std::{
    any,
    fmt,
    marker::PhantomData,
    sync::Arc
};

/// A recorded argument value.
///
/// `Value` is implemented for every `'static` type that is `Debug`,
/// `PartialEq`, `Send` and `Sync`.  Those are the bounds that a mocked
/// method's parameters must satisfy, because every argument is kept in the
/// invocation log and compared by the matchers long after the call returned.
pub trait Value: Any + fmt::Debug + Send + Sync {
    /// Compare with another recorded value.  Values of different types are
    /// never equal.
    fn equals(&self, other: &dyn Value) -> bool;

    /// Name of the concrete type, for diagnostics.
    fn type_label(&self) -> &'static str;
}
downcast!(dyn Value);

impl<T> Value for T
    where T: fmt::Debug + PartialEq + Send + Sync + 'static
{
    fn equals(&self, other: &dyn Value) -> bool {
        other.downcast_ref::<T>().map_or(false, |other| self == other)
    }

    fn type_label(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// A shared, type-erased argument as stored in an [`Invocation`].
///
/// [`Invocation`]: crate::Invocation
pub type Arg = Arc<dyn Value>;

/// Erase an argument for recording.  Used by generated mocks.
pub fn arg<T: Value>(value: T) -> Arg {
    Arc::new(value)
}

/// A type-erased return value, produced afresh for every answered call.
pub type Reply = Box<dyn any::Any + Send>;

/// Erase a return value.  Useful for [`DefaultAnswer::custom`].
///
/// [`DefaultAnswer::custom`]: crate::DefaultAnswer::custom
pub fn reply<T: Send + 'static>(value: T) -> Reply {
    Box::new(value)
}

// Generated mocks produce the zero value of a return type with
// `(&DefaultReturner::<O>::new()).return_default()`, importing both traits
// below.  Method resolution picks `ReturnDefault` when `O: Default`, and falls
// back to the auto-referenced `ReturnNoDefault` otherwise.
#[doc(hidden)]
pub struct DefaultReturner<O>(PhantomData<fn() -> O>);

impl<O> DefaultReturner<O> {
    pub fn new() -> Self {
        DefaultReturner(PhantomData)
    }
}

impl<O> Default for DefaultReturner<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[doc(hidden)]
pub trait ReturnDefault<O> {
    fn return_default(&self) -> Option<O>;
}

impl<O: Default> ReturnDefault<O> for DefaultReturner<O> {
    fn return_default(&self) -> Option<O> {
        Some(O::default())
    }
}

#[doc(hidden)]
pub trait ReturnNoDefault<O> {
    fn return_default(&self) -> Option<O>;
}

impl<O> ReturnNoDefault<O> for &DefaultReturner<O> {
    fn return_default(&self) -> Option<O> {
        None
    }
}

#[cfg(test)]
mod t {
    use super::*;

    #[test]
    fn equals_same_type() {
        let a = arg(5u32);
        assert!(!a.equals(&7u32));
        assert!(a.equals(&5u32));
    }

    #[test]
    fn equals_other_type() {
        let a = arg(5u32);
        assert!(!a.equals(&5i64));
    }

    #[test]
    fn zero_values() {
        let n: Option<u32> = (&DefaultReturner::<u32>::new()).return_default();
        assert_eq!(Some(0), n);

        struct NoDefault;
        let nd: Option<NoDefault> =
            (&DefaultReturner::<NoDefault>::new()).return_default();
        assert!(nd.is_none());
    }
}
