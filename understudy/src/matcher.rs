// vim: tw=80
//! Argument matchers and captors.

use std::{
    fmt,
    marker::PhantomData,
    sync::{Arc, Mutex}
};

use predicates::prelude::{predicate, Predicate};
use predicates_tree::CaseTreeExt;

use crate::{
    invocation::{Invocation, MethodSignature},
    value::{Arg, Value}
};

/// A type-erased test applied to one argument of a call.
#[derive(Clone)]
pub struct Matcher(Arc<Kind>);

enum Kind {
    Equals(Arg),
    Any,
    TypeIs {
        type_name: &'static str,
        check: fn(&dyn Value) -> bool,
    },
    Predicate(Box<dyn ErasedPredicate>),
    Captor(Arc<dyn CaptureSink>),
}

trait ErasedPredicate: Send + Sync {
    fn eval(&self, value: &dyn Value) -> bool;
    fn explain(&self, value: &dyn Value) -> Option<String>;
    fn describe(&self) -> String;
}

struct TypedPredicate<T, P> {
    predicate: P,
    _t: PhantomData<fn(&T)>,
}

impl<T, P> ErasedPredicate for TypedPredicate<T, P>
    where T: Value,
          P: Predicate<T> + Send + Sync
{
    fn eval(&self, value: &dyn Value) -> bool {
        value.downcast_ref::<T>().map_or(false, |v| self.predicate.eval(v))
    }

    fn explain(&self, value: &dyn Value) -> Option<String> {
        let v = value.downcast_ref::<T>().ok()?;
        self.predicate.find_case(false, v)
            .map(|case| case.tree().to_string())
    }

    fn describe(&self) -> String {
        self.predicate.to_string()
    }
}

trait CaptureSink: Send + Sync {
    fn capture(&self, value: &dyn Value);
}

impl<T: Value + Clone> CaptureSink for Mutex<Vec<T>> {
    fn capture(&self, value: &dyn Value) {
        if let Ok(v) = value.downcast_ref::<T>() {
            self.lock().unwrap().push(v.clone());
        }
    }
}

fn is_type<T: Value>(value: &dyn Value) -> bool {
    value.is::<T>()
}

impl Matcher {
    /// Matches arguments equal to `value`.
    pub fn equals<T: Value>(value: T) -> Self {
        Self::from_arg(Arc::new(value))
    }

    pub(crate) fn from_arg(value: Arg) -> Self {
        Matcher(Arc::new(Kind::Equals(value)))
    }

    /// Matches anything.
    pub fn any() -> Self {
        Matcher(Arc::new(Kind::Any))
    }

    /// Matches any argument whose concrete type is `T`.
    pub fn type_is<T: Value>() -> Self {
        Matcher(Arc::new(Kind::TypeIs {
            type_name: std::any::type_name::<T>(),
            check: is_type::<T>
        }))
    }

    /// Matches arguments of type `T` that satisfy `predicate`.
    pub fn predicate<T, P>(predicate: P) -> Self
        where T: Value,
              P: Predicate<T> + Send + Sync + 'static
    {
        let erased = TypedPredicate { predicate, _t: PhantomData };
        Matcher(Arc::new(Kind::Predicate(Box::new(erased))))
    }

    pub fn matches(&self, value: &dyn Value) -> bool {
        match &*self.0 {
            Kind::Equals(expected) => expected.equals(value),
            Kind::Any | Kind::Captor(_) => true,
            Kind::TypeIs { check, .. } => check(value),
            Kind::Predicate(p) => p.eval(value),
        }
    }

    /// Feed a matched argument to this matcher's captor, if it is one.
    pub(crate) fn capture(&self, value: &dyn Value) {
        if let Kind::Captor(sink) = &*self.0 {
            sink.capture(value);
        }
    }

    /// Explain why `value` does not match, if there is more to say than the
    /// matcher's own description.
    pub(crate) fn explain(&self, value: &dyn Value) -> Option<String> {
        match &*self.0 {
            Kind::Equals(expected) => {
                Some(format!("expected {:?}, was {:?}", expected, value))
            },
            Kind::TypeIs { type_name, .. } => {
                Some(format!("expected a {}, was a {}", type_name,
                             value.type_label()))
            },
            Kind::Predicate(p) => p.explain(value),
            Kind::Any | Kind::Captor(_) => None,
        }
    }

    /// Whether two matchers are interchangeable, for the purpose of
    /// replacing an earlier stubbing of the same call.
    pub(crate) fn same_as(&self, other: &Matcher) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (&*self.0, &*other.0) {
            (Kind::Equals(a), Kind::Equals(b)) => a.equals(&**b),
            (Kind::Any, Kind::Any) => true,
            (Kind::TypeIs { type_name: a, .. },
             Kind::TypeIs { type_name: b, .. }) => a == b,
            _ => false
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            Kind::Equals(v) => write!(f, "{:?}", v),
            Kind::Any => write!(f, "any()"),
            Kind::TypeIs { type_name, .. } =>
                write!(f, "is_a::<{}>()", type_name),
            Kind::Predicate(p) => write!(f, "arg_that({})", p.describe()),
            Kind::Captor(_) => write!(f, "captor"),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A [`Matcher`] for an argument of type `T`.
///
/// Generated call selectors accept `impl Into<ArgMatcher<T>>`, so a plain
/// value may stand in for [`eq`]`(value)`.
pub struct ArgMatcher<T> {
    matcher: Matcher,
    _t: PhantomData<fn(T)>,
}

impl<T> ArgMatcher<T> {
    fn new(matcher: Matcher) -> Self {
        ArgMatcher { matcher, _t: PhantomData }
    }

    pub fn into_matcher(self) -> Matcher {
        self.matcher
    }
}

impl<T: Value> From<T> for ArgMatcher<T> {
    fn from(value: T) -> Self {
        eq(value)
    }
}

impl<'a> From<&'a str> for ArgMatcher<String> {
    fn from(value: &'a str) -> Self {
        eq(value.to_owned())
    }
}

impl<T> fmt::Debug for ArgMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.matcher, f)
    }
}

/// Matches an argument equal to `value`.
pub fn eq<T: Value>(value: T) -> ArgMatcher<T> {
    ArgMatcher::new(Matcher::equals(value))
}

/// Matches any argument.
pub fn any<T>() -> ArgMatcher<T> {
    ArgMatcher::new(Matcher::any())
}

/// Matches any argument whose concrete type is `T`.
///
/// For a statically typed parameter this matches every value, like
/// [`any`].  It only discriminates among arguments of an erased type.
pub fn any_of_type<T: Value>() -> ArgMatcher<T> {
    ArgMatcher::new(Matcher::type_is::<T>())
}

/// Synonym for [`any_of_type`].
pub fn is_a<T: Value>() -> ArgMatcher<T> {
    any_of_type()
}

/// Matches arguments that satisfy a [`Predicate`].
///
/// ```
/// # use understudy::*;
/// let m = arg_that(predicate::ge(5u32)).into_matcher();
/// assert!(m.matches(&7u32));
/// assert!(!m.matches(&3u32));
/// ```
pub fn arg_that<T, P>(predicate: P) -> ArgMatcher<T>
    where T: Value,
          P: Predicate<T> + Send + Sync + 'static
{
    ArgMatcher::new(Matcher::predicate(predicate))
}

/// Matches arguments for which `f` returns true.
pub fn arg_where<T, F>(f: F) -> ArgMatcher<T>
    where T: Value,
          F: Fn(&T) -> bool + Send + Sync + 'static
{
    arg_that(predicate::function(f))
}

/// A matcher that accepts every argument and keeps a copy of each one it
/// was used to verify or stub.
///
/// Values are captured only when every other matcher of the same call
/// matched too.
///
/// ```
/// # use understudy::*;
/// #[automock]
/// trait Log {
///     fn write(&self, line: String);
/// }
///
/// let ctx = Context::new();
/// let log = MockLog::new(&ctx);
/// log.write("started".to_owned());
/// log.write("stopped".to_owned());
///
/// let lines = Captor::<String>::new();
/// verify(&log, times(2)).write(lines.capture()).unwrap();
/// assert_eq!(lines.all_values(), ["started", "stopped"]);
/// assert_eq!(lines.value().as_deref(), Some("stopped"));
/// ```
pub struct Captor<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Value + Clone> Captor<T> {
    pub fn new() -> Self {
        Captor { values: Arc::new(Mutex::new(Vec::new())) }
    }

    /// A matcher that feeds this captor.
    pub fn capture(&self) -> ArgMatcher<T> {
        let sink: Arc<dyn CaptureSink> = self.values.clone();
        ArgMatcher::new(Matcher(Arc::new(Kind::Captor(sink))))
    }

    /// The most recently captured value.
    pub fn value(&self) -> Option<T> {
        self.values.lock().unwrap().last().cloned()
    }

    /// Every captured value, oldest first.
    pub fn all_values(&self) -> Vec<T> {
        self.values.lock().unwrap().clone()
    }
}

impl<T: Value + Clone> Default for Captor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Captor<T> {
    fn clone(&self) -> Self {
        Captor { values: self.values.clone() }
    }
}

/// The method and per-argument matchers that a stubbing or verification
/// applies to.
#[derive(Clone, Debug)]
pub struct CallPattern {
    method: &'static MethodSignature,
    matchers: Vec<Matcher>,
}

impl CallPattern {
    /// Used by generated mocks, which always supply one matcher per
    /// parameter.  See [`MockHandle::pattern`](crate::MockHandle::pattern)
    /// for a checked constructor.
    pub fn new(method: &'static MethodSignature, matchers: Vec<Matcher>)
        -> Self
    {
        CallPattern { method, matchers }
    }

    /// A pattern matching exactly the arguments of `invocation`.
    pub(crate) fn from_invocation(invocation: &Invocation) -> Self {
        let matchers = invocation.args()
            .iter()
            .cloned()
            .map(Matcher::from_arg)
            .collect();
        CallPattern { method: invocation.method(), matchers }
    }

    pub fn method(&self) -> &'static MethodSignature {
        self.method
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn matches(&self, invocation: &Invocation) -> bool {
        self.method.same(invocation.method()) &&
            self.matchers.len() == invocation.args().len() &&
            self.matchers.iter()
                .zip(invocation.args())
                .all(|(m, a)| m.matches(&**a))
    }

    /// Run any captors over a matching invocation's arguments.
    pub(crate) fn capture_from(&self, invocation: &Invocation) {
        for (m, a) in self.matchers.iter().zip(invocation.args()) {
            m.capture(&**a);
        }
    }

    pub(crate) fn same_as(&self, other: &CallPattern) -> bool {
        self.method.same(other.method) &&
            self.matchers.len() == other.matchers.len() &&
            self.matchers.iter()
                .zip(other.matchers.iter())
                .all(|(a, b)| a.same_as(b))
    }

    /// Why each argument of an invocation of the same method fails to match.
    pub(crate) fn explain(&self, invocation: &Invocation) -> Vec<String> {
        self.matchers.iter()
            .zip(invocation.args())
            .enumerate()
            .filter(|(_, (m, a))| !m.matches(&***a))
            .map(|(i, (m, a))| {
                match m.explain(&**a) {
                    Some(why) => format!("argument {}: {}", i, why),
                    None => format!("argument {}: {:?} does not match {}",
                                    i, a, m)
                }
            }).collect()
    }
}

impl fmt::Display for CallPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method.name)?;
        for (i, m) in self.matchers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", m)?;
        }
        write!(f, ")")
    }
}
