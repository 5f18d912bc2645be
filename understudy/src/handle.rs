// vim: tw=80
//! The per-mock state shared by a mock and everything that stubs or verifies
//! it.

use std::{
    fmt,
    panic::{RefUnwindSafe, UnwindSafe},
    sync::{Arc, Mutex}
};

use tracing::debug;

use crate::{
    answer::{Answer, DefaultAnswer},
    context::Context,
    error::{Error, Result},
    invocation::{Invocation, MethodSet, MethodSignature, MockId, Recorder},
    matcher::{CallPattern, Matcher},
    stub::{OngoingStubbing, RuleId, StubRegistry},
    value::Arg
};

/// Creation options for a mock.
///
/// ```
/// # use understudy::*;
/// let options = MockOptions::new()
///     .name("primary")
///     .default_answer(DefaultAnswer::ReturnSmartNulls)
///     .serializable(true);
/// # let _ = options;
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockOptions {
    name: Option<String>,
    default_answer: DefaultAnswer,
    serializable: bool,
}

impl MockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the mock in diagnostics.  By default mocks are named after their
    /// type, with a lowercased first letter.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Choose what unstubbed calls return.
    pub fn default_answer(mut self, answer: DefaultAnswer) -> Self {
        self.default_answer = answer;
        self
    }

    /// Mark the mock as serializable.  This is a flag reported by
    /// [`mocking_details`](crate::mocking_details); it changes no behavior.
    pub fn serializable(mut self, serializable: bool) -> Self {
        self.serializable = serializable;
        self
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_default_answer(&self) -> &DefaultAnswer {
        &self.default_answer
    }

    pub fn is_serializable(&self) -> bool {
        self.serializable
    }
}

struct HandleInner {
    id: MockId,
    name: Arc<str>,
    methods: &'static MethodSet,
    context: Context,
    options: MockOptions,
    spy: bool,
    recorder: Recorder,
    registry: Mutex<StubRegistry>,
}

/// A shared reference to one mock's identity, invocation log, and
/// stubbings.
///
/// Every mock owns one, exposed through [`Double::handle`].  Cloning a handle
/// is cheap, and all clones refer to the same mock.
///
/// [`Double::handle`]: crate::Double::handle
#[derive(Clone)]
pub struct MockHandle {
    inner: Arc<HandleInner>,
}

impl MockHandle {
    pub(crate) fn new(
        context: &Context,
        methods: &'static MethodSet,
        options: MockOptions,
        spy: bool) -> Self
    {
        let id = context.next_mock_id();
        let name: Arc<str> = match options.get_name() {
            Some(n) => Arc::from(n),
            None => Arc::from(default_name(methods.name))
        };
        debug!(mock = %name, spy, "created mock of {}", methods.name);
        MockHandle {
            inner: Arc::new(HandleInner {
                id,
                name,
                methods,
                context: context.clone(),
                options,
                spy,
                recorder: Recorder::default(),
                registry: Mutex::new(StubRegistry::default()),
            })
        }
    }

    pub fn id(&self) -> MockId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn methods(&self) -> &'static MethodSet {
        self.inner.methods
    }

    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    pub fn options(&self) -> &MockOptions {
        &self.inner.options
    }

    pub fn is_spy(&self) -> bool {
        self.inner.spy
    }

    /// Build a pattern for one of this mock's methods, by name.
    ///
    /// This is the untyped counterpart of the call selectors that generated
    /// mocks provide.
    pub fn pattern(&self, method: &str, matchers: Vec<Matcher>)
        -> Result<CallPattern>
    {
        let signature = self.inner.methods.find(method).ok_or_else(|| {
            Error::UnsupportedMockTarget(format!("{} has no method {}",
                self.name(), method))
        })?;
        if signature.arity() != matchers.len() {
            return Err(Error::StubbingConfiguration(format!(
                "{} takes {} argument(s), but {} matcher(s) were given",
                signature, signature.arity(), matchers.len())));
        }
        Ok(CallPattern::new(signature, matchers))
    }

    /// Start an untyped stubbing.  `R` must be the method's return type, or
    /// the stubbed call will panic.
    pub fn stub<R: Send + 'static>(&self, pattern: CallPattern)
        -> OngoingStubbing<R>
    {
        OngoingStubbing::new(self.clone(), pattern)
    }

    /// A snapshot of every recorded call, in call order.
    pub fn invocations(&self) -> Vec<Arc<Invocation>> {
        self.inner.recorder.snapshot()
    }

    /// The number of installed stubbings.
    pub fn stubbings(&self) -> usize {
        self.inner.registry.lock().unwrap().len()
    }

    /// Forget every stubbing and every recorded call.
    pub fn reset(&self) {
        let mut log = self.inner.recorder.lock();
        let mut registry = self.inner.registry.lock().unwrap();
        log.clear();
        registry.clear();
        debug!(mock = %self.inner.name, "reset");
    }

    /// Forget every recorded call, keeping the stubbings.
    pub fn clear_invocations(&self) {
        self.inner.recorder.clear();
    }

    pub(crate) fn record(&self, method: &'static MethodSignature,
                         args: Vec<Arg>)
        -> Arc<Invocation>
    {
        self.inner.recorder.append(&self.inner.context, self.inner.id,
                                   &self.inner.name, method, args)
    }

    pub(crate) fn retract(&self, invocation: &Invocation) {
        self.inner.recorder.retract(invocation.sequence());
    }

    pub(crate) fn resolve(&self, invocation: &Invocation) -> Option<Answer> {
        self.inner.registry.lock().unwrap().resolve(invocation)
    }

    pub(crate) fn install(
        &self,
        rule: Option<RuleId>,
        pattern: &CallPattern,
        answers: &[Answer]) -> RuleId
    {
        self.inner.registry.lock().unwrap().install(rule, pattern, answers)
    }

    /// What an unstubbed call returns.
    pub(crate) fn default_reply<R: 'static>(
        &self,
        invocation: &Invocation,
        zero: Option<R>) -> R
    {
        self.inner.options.get_default_answer().answer(invocation, zero)
    }
}

impl fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("spy", &self.inner.spy)
            .finish()
    }
}

// Stubbed answers may unwind through a mocked call.  No lock is held while they
// do, so a mock remains consistent afterwards.
impl UnwindSafe for MockHandle {}
impl RefUnwindSafe for MockHandle {}

fn default_name(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new()
    }
}

/// Introspection results from [`mocking_details`](crate::mocking_details).
#[derive(Clone, Debug)]
pub struct MockingDetails {
    pub name: String,
    pub is_mock: bool,
    pub is_spy: bool,
    pub serializable: bool,
    /// Every recorded call, in call order.
    pub invocations: Vec<Arc<Invocation>>,
    /// The number of installed stubbings.
    pub stubbings: usize,
}

impl MockingDetails {
    pub(crate) fn of(handle: &MockHandle) -> Self {
        MockingDetails {
            name: handle.name().to_owned(),
            is_mock: true,
            is_spy: handle.is_spy(),
            serializable: handle.options().is_serializable(),
            invocations: handle.invocations(),
            stubbings: handle.stubbings(),
        }
    }
}
