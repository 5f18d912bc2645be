// vim: tw=80
//! The traits that generated mocks implement, and the dispatcher behind
//! every mocked method.

use std::{
    any::TypeId,
    fmt,
    panic,
    sync::{Mutex, PoisonError}
};

use crate::{
    answer::Outcome,
    context::{CallCaptured, Context},
    handle::{MockHandle, MockOptions},
    invocation::{MethodSet, MethodSignature},
    matcher::CallPattern,
    value::Arg
};

/// Anything with a [`MockHandle`].  Object safe, so that mocks of different
/// types can be verified together.
pub trait Double {
    fn handle(&self) -> &MockHandle;
}

/// Consumes the [`CallPattern`] built by a call selector.
///
/// `stub`, `verify`, `InOrder::verify` and `DoAnswer::when` each return a
/// call selector wrapping a different sink.  The selector has one method per
/// mocked method, taking one matcher per parameter, and hands the finished
/// pattern to the sink along with the method's return type.
pub trait Sink {
    type Output<R: Send + 'static>;

    fn accept<R: Send + 'static>(self, pattern: CallPattern)
        -> Self::Output<R>;
}

/// A generated mock type.
pub trait Mocked: Double + Sized {
    /// A trait object type implemented by every value the mock can spy on.
    type Contract: ?Sized + Send + 'static;

    /// The call selector.
    type Calls<S: Sink>;

    fn method_set() -> &'static MethodSet;

    fn from_mock(mock: Mock<Self::Contract>) -> Self;

    fn calls<S: Sink>(sink: S) -> Self::Calls<S>;
}

/// The state behind a generated mock: its handle, plus the real object if it
/// is a spy.
pub struct Mock<D: ?Sized> {
    handle: MockHandle,
    delegate: Option<Mutex<Box<D>>>,
}

impl<D: ?Sized + Send> Mock<D> {
    pub fn new(
        context: &Context,
        methods: &'static MethodSet,
        options: MockOptions) -> Self
    {
        Mock {
            handle: MockHandle::new(context, methods, options, false),
            delegate: None
        }
    }

    pub fn spy(
        context: &Context,
        methods: &'static MethodSet,
        real: Box<D>,
        options: MockOptions) -> Self
    {
        Mock {
            handle: MockHandle::new(context, methods, options, true),
            delegate: Some(Mutex::new(real))
        }
    }

    pub fn handle(&self) -> &MockHandle {
        &self.handle
    }

    /// Handle one call of a mocked method.
    ///
    /// The call is recorded, then answered by the newest matching stubbing.
    /// Unstubbed calls go to the real object for spies, and to the default
    /// answer for mocks.  `zero` is the return type's default value, if it
    /// has one.  `real` runs the method on the real object.
    pub fn dispatch<R, F>(
        &self,
        method: &'static MethodSignature,
        args: Vec<Arg>,
        zero: Option<R>,
        real: F) -> R
        where R: Send + 'static,
              F: FnOnce(&mut D) -> R
    {
        let invocation = self.handle.record(method, args);
        let captured = self.handle.context()
            .observe(&self.handle, &invocation, TypeId::of::<R>());
        // Resolution releases the registry lock before answering, so answers
        // may call back into this mock.
        let outcome = match self.handle.resolve(&invocation) {
            Some(answer) => answer.execute::<R>(&invocation),
            None if self.delegate.is_some() => Outcome::Delegate,
            // Context::when only needs the call, not a reply
            None if captured && zero.is_none() => {
                panic::resume_unwind(Box::new(CallCaptured))
            },
            None => Outcome::Value(
                self.handle.default_reply(&invocation, zero))
        };
        match (outcome, &self.delegate) {
            (Outcome::Value(r), _) => r,
            (Outcome::Delegate, Some(delegate)) => {
                let mut real_object = delegate.lock()
                    .unwrap_or_else(PoisonError::into_inner);
                real(&mut **real_object)
            },
            (Outcome::Delegate, None) => {
                panic!("{} has no real method to call", invocation)
            }
        }
    }
}

impl Double for MockHandle {
    fn handle(&self) -> &MockHandle {
        self
    }
}

impl<D: ?Sized> Double for Mock<D> {
    fn handle(&self) -> &MockHandle {
        &self.handle
    }
}

impl<D: ?Sized> fmt::Debug for Mock<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.handle, f)
    }
}

/// Create a mock.  Same as `M::with_options(ctx, options)`.
pub fn create_mock<M: Mocked>(ctx: &Context, options: MockOptions) -> M {
    M::from_mock(Mock::new(ctx, M::method_set(), options))
}

/// Create a spy around `real`.  Same as `M::spy(ctx, real)`.
pub fn create_spy<M: Mocked>(ctx: &Context, real: Box<M::Contract>) -> M {
    create_spy_with_options(ctx, real, MockOptions::default())
}

pub fn create_spy_with_options<M: Mocked>(
    ctx: &Context,
    real: Box<M::Contract>,
    options: MockOptions) -> M
{
    M::from_mock(Mock::spy(ctx, M::method_set(), real, options))
}
