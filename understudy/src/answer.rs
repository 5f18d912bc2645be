// vim: tw=80
//! What a stubbed call does, and what an unstubbed one falls back to.

use std::{
    any::{self, TypeId},
    fmt,
    panic,
    sync::Arc
};

use fragile::Fragile;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    invocation::{Invocation, MethodSignature},
    value::{reply, Reply}
};

type Produce = Arc<dyn Fn(&Invocation) -> Reply + Send + Sync>;

#[derive(Clone)]
enum Kind {
    Return(Produce),
    Throw {
        describe: String,
        raise: Arc<dyn Fn() -> Box<dyn any::Any + Send> + Send + Sync>,
    },
    Compute(Produce),
    CallRealMethod,
}

/// One behavior of a stubbed call.
///
/// A stubbing holds an ordered list of answers.  Successive matching calls
/// consume them in order, and the last one repeats forever.
#[derive(Clone)]
pub struct Answer {
    kind: Kind,
    output: Option<(TypeId, &'static str)>,
}

impl Answer {
    /// Return a clone of `value`.
    pub fn returning<T>(value: T) -> Self
        where T: Clone + Send + Sync + 'static
    {
        Answer {
            kind: Kind::Return(Arc::new(move |_: &Invocation| {
                reply(value.clone())
            })),
            output: Some((TypeId::of::<T>(), any::type_name::<T>()))
        }
    }

    /// Raise `error` in the caller, by unwinding with a clone of it as the
    /// panic payload.  Catch it with [`std::panic::catch_unwind`].
    pub fn throwing<E>(error: E) -> Self
        where E: Clone + fmt::Debug + Send + Sync + 'static
    {
        Answer {
            kind: Kind::Throw {
                describe: format!("{:?}", error),
                raise: Arc::new(move || {
                    Box::new(error.clone()) as Box<dyn any::Any + Send>
                })
            },
            output: None
        }
    }

    /// Compute the result from the invocation.
    pub fn computing<T, F>(f: F) -> Self
        where T: Send + 'static,
              F: Fn(&Invocation) -> T + Send + Sync + 'static
    {
        Answer {
            kind: Kind::Compute(Arc::new(move |i: &Invocation| reply(f(i)))),
            output: Some((TypeId::of::<T>(), any::type_name::<T>()))
        }
    }

    /// Like [`Answer::computing`], but for closures that are not `Send`.
    /// Calling the mock from any thread other than the one that created the
    /// answer will panic.
    pub fn computing_st<T, F>(f: F) -> Self
        where T: Send + 'static,
              F: Fn(&Invocation) -> T + 'static
    {
        let f = Fragile::new(f);
        Answer {
            kind: Kind::Compute(Arc::new(move |i: &Invocation| {
                reply((f.get())(i))
            })),
            output: Some((TypeId::of::<T>(), any::type_name::<T>()))
        }
    }

    /// Run the spy's real method.
    pub fn call_real_method() -> Self {
        Answer { kind: Kind::CallRealMethod, output: None }
    }

    pub(crate) fn is_call_real_method(&self) -> bool {
        matches!(self.kind, Kind::CallRealMethod)
    }

    /// Check that this answer can produce the return type `R` of `method`.
    pub(crate) fn check_output<R: 'static>(&self, method: &MethodSignature)
        -> Result<()>
    {
        match self.output {
            Some((t, name)) if t != TypeId::of::<R>() => {
                Err(Error::StubbingConfiguration(format!(
                    "`{}` cannot be returned by {}, which returns `{}`",
                    name, method.name, method.returns)))
            },
            _ => Ok(())
        }
    }

    pub(crate) fn execute<R: 'static>(&self, invocation: &Invocation)
        -> Outcome<R>
    {
        match &self.kind {
            Kind::Return(produce) | Kind::Compute(produce) => {
                Outcome::Value(downcast_reply(produce(invocation), invocation))
            },
            Kind::Throw { describe, raise } => {
                debug!("{} throws {}", invocation, describe);
                panic::resume_unwind(raise())
            },
            Kind::CallRealMethod => Outcome::Delegate
        }
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Return(_) => write!(f, "Return({})",
                self.output.map_or("?", |(_, n)| n)),
            Kind::Throw { describe, .. } => write!(f, "Throw({})", describe),
            Kind::Compute(_) => write!(f, "Compute"),
            Kind::CallRealMethod => write!(f, "CallRealMethod"),
        }
    }
}

pub(crate) enum Outcome<R> {
    Value(R),
    Delegate
}

fn downcast_reply<R: 'static>(reply: Reply, invocation: &Invocation) -> R {
    match reply.downcast::<R>() {
        Ok(r) => *r,
        Err(_) => panic!("Answer for {} did not produce a `{}`", invocation,
                         any::type_name::<R>())
    }
}

/// What an unstubbed call on a mock returns.
#[derive(Clone, Default)]
pub enum DefaultAnswer {
    /// The return type's zero value: `0`, `false`, `None`, empty strings and
    /// collections, `()`, and generally `Default::default()`.  Calls whose
    /// return type has no default panic.
    #[default]
    ReturnDefaults,
    /// Like `ReturnDefaults`, but a call whose return type has no default
    /// panics with a message naming the unstubbed invocation and the method's
    /// signature, rather than a terse one.
    ReturnSmartNulls,
    /// Ask a closure.  It returns `None` to defer to `ReturnDefaults`, and
    /// must otherwise produce a value of the method's return type.
    Custom(Arc<dyn Fn(&Invocation) -> Option<Reply> + Send + Sync>),
}

impl DefaultAnswer {
    /// ```
    /// # use understudy::*;
    /// let answer = DefaultAnswer::custom(|i| {
    ///     (i.method().returns == "u32").then(|| reply(42u32))
    /// });
    /// # let _ = answer;
    /// ```
    pub fn custom<F>(f: F) -> Self
        where F: Fn(&Invocation) -> Option<Reply> + Send + Sync + 'static
    {
        DefaultAnswer::Custom(Arc::new(f))
    }

    pub(crate) fn answer<R: 'static>(
        &self,
        invocation: &Invocation,
        zero: Option<R>) -> R
    {
        if let DefaultAnswer::Custom(f) = self {
            if let Some(reply) = f(invocation) {
                match reply.downcast::<R>() {
                    Ok(r) => return *r,
                    Err(_) => warn!(
                        "default answer for {} produced the wrong type; \
                         expected `{}`", invocation, any::type_name::<R>())
                }
            }
        }
        match (zero, self) {
            (Some(r), _) => r,
            (None, DefaultAnswer::ReturnSmartNulls) => panic!(
                "Unstubbed call {} has no default return value.\n\
                 The method {} was never stubbed for these arguments, and \
                 `{}` does not implement Default.  Stub it with \
                 stub(&mock).{}(..).then_return(..)",
                invocation, invocation.method(), invocation.method().returns,
                invocation.method().name),
            (None, _) => panic!(
                "{}: no matching stubbing, and `{}` has no default value",
                invocation, invocation.method().returns)
        }
    }
}

impl fmt::Debug for DefaultAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultAnswer::ReturnDefaults => write!(f, "ReturnDefaults"),
            DefaultAnswer::ReturnSmartNulls => write!(f, "ReturnSmartNulls"),
            DefaultAnswer::Custom(_) => write!(f, "Custom"),
        }
    }
}
