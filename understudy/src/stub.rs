// vim: tw=80
//! Stubbing rules and the builders that install them.

use std::{fmt, marker::PhantomData};

use tracing::debug;

use crate::{
    answer::Answer,
    error::{Error, Result},
    handle::MockHandle,
    invocation::Invocation,
    matcher::CallPattern,
    mock::{Mocked, Sink}
};

/// Identifies one installed stubbing within its mock.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct RuleId(u64);

struct StubRule {
    id: RuleId,
    pattern: CallPattern,
    answers: Vec<Answer>,
    used: usize,
}

impl StubRule {
    /// The answer for the next matching call.  Answers are consumed in order,
    /// and the last one repeats.
    fn next_answer(&mut self) -> Option<Answer> {
        let last = self.answers.len().checked_sub(1)?;
        let answer = self.answers[self.used.min(last)].clone();
        self.used += 1;
        Some(answer)
    }
}

/// The stubbings of one mock, oldest first.
#[derive(Default)]
pub(crate) struct StubRegistry {
    rules: Vec<StubRule>,
    next_id: u64,
}

impl StubRegistry {
    /// Install `answers` for `pattern`.
    ///
    /// If `rule` still exists its answers are replaced in place and it keeps
    /// its position and consumption count.  Otherwise a new rule is appended,
    /// replacing any earlier rule with an identical pattern.
    pub(crate) fn install(
        &mut self,
        rule: Option<RuleId>,
        pattern: &CallPattern,
        answers: &[Answer]) -> RuleId
    {
        if let Some(existing) = rule
            .and_then(|id| self.rules.iter_mut().find(|r| r.id == id))
        {
            existing.answers = answers.to_vec();
            return existing.id;
        }
        self.rules.retain(|r| !r.pattern.same_as(pattern));
        let id = RuleId(self.next_id);
        self.next_id += 1;
        self.rules.push(StubRule {
            id,
            pattern: pattern.clone(),
            answers: answers.to_vec(),
            used: 0
        });
        id
    }

    /// Find the answer for a call.  The most recently installed matching rule
    /// wins.
    pub(crate) fn resolve(&mut self, invocation: &Invocation)
        -> Option<Answer>
    {
        let rule = self.rules.iter_mut()
            .rev()
            .find(|r| r.pattern.matches(invocation))?;
        rule.pattern.capture_from(invocation);
        rule.next_answer()
    }

    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }

    pub(crate) fn clear(&mut self) {
        self.rules.clear();
    }
}

/// An in-progress stubbing, returned by [`stub`](crate::stub) and
/// [`Context::when`](crate::Context::when).
///
/// Every `then_*` call appends an answer.  The stubbing takes effect as soon
/// as the first answer is supplied.
pub struct OngoingStubbing<R> {
    handle: MockHandle,
    pattern: CallPattern,
    answers: Vec<Answer>,
    rule: Option<RuleId>,
    _r: PhantomData<fn() -> R>,
}

impl<R: Send + 'static> OngoingStubbing<R> {
    pub(crate) fn new(handle: MockHandle, pattern: CallPattern) -> Self {
        OngoingStubbing {
            handle,
            pattern,
            answers: Vec::new(),
            rule: None,
            _r: PhantomData
        }
    }

    fn push(mut self, answers: impl IntoIterator<Item=Answer>) -> Self {
        let before = self.answers.len();
        self.answers.extend(answers);
        if self.answers.len() > before {
            debug!("stubbing {}.{} with {:?}", self.handle.name(),
                   self.pattern, self.answers);
            self.rule = Some(self.handle.install(self.rule, &self.pattern,
                                                 &self.answers));
        }
        self
    }

    /// Return a clone of `value`.
    pub fn then_return(self, value: R) -> Self
        where R: Clone + Sync
    {
        self.push(Some(Answer::returning(value)))
    }

    /// Return each of `values` in turn, one per call.
    pub fn then_return_values<I>(self, values: I) -> Self
        where I: IntoIterator<Item=R>,
              R: Clone + Sync
    {
        self.push(values.into_iter().map(Answer::returning))
    }

    /// Unwind from the call with `error` as the panic payload.
    pub fn then_throw<E>(self, error: E) -> Self
        where E: Clone + fmt::Debug + Send + Sync + 'static
    {
        self.push(Some(Answer::throwing(error)))
    }

    /// Compute the result from the invocation.
    pub fn then_answer<F>(self, f: F) -> Self
        where F: Fn(&Invocation) -> R + Send + Sync + 'static
    {
        self.push(Some(Answer::computing(f)))
    }

    /// Single-threaded version of [`then_answer`](Self::then_answer), for
    /// closures that are not `Send`.  The mock will panic if the call is made
    /// from any other thread.
    pub fn then_answer_st<F>(self, f: F) -> Self
        where F: Fn(&Invocation) -> R + 'static
    {
        self.push(Some(Answer::computing_st(f)))
    }

    /// Run the real method.  Only spies have one.
    pub fn then_call_real_method(self) -> Result<Self> {
        if !self.handle.is_spy() {
            return Err(Error::StubbingConfiguration(format!(
                "{} is not a spy, so {} has no real method to call",
                self.handle.name(), self.pattern.method().name)));
        }
        Ok(self.push(Some(Answer::call_real_method())))
    }
}

impl<R> fmt::Debug for OngoingStubbing<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OngoingStubbing")
            .field("mock", &self.handle.name())
            .field("pattern", &self.pattern)
            .field("answers", &self.answers)
            .finish()
    }
}

/// The [`Sink`] behind [`stub`](crate::stub).
pub struct StubSink {
    handle: MockHandle,
}

impl StubSink {
    pub(crate) fn new(handle: MockHandle) -> Self {
        StubSink { handle }
    }
}

impl Sink for StubSink {
    type Output<R: Send + 'static> = OngoingStubbing<R>;

    fn accept<R: Send + 'static>(self, pattern: CallPattern)
        -> OngoingStubbing<R>
    {
        OngoingStubbing::new(self.handle, pattern)
    }
}

/// Answers chosen before the call they apply to, as in
/// `do_return(5).when(&mock).size()`.
///
/// Useful for methods returning `()`, and for spies, whose real method
/// would otherwise run while [`Context::when`](crate::Context::when)
/// records the call.
#[must_use = "call .when(&mock) to choose the stubbed call"]
#[derive(Clone, Debug)]
pub struct DoAnswer {
    answers: Vec<Answer>,
}

impl DoAnswer {
    fn with(mut self, answer: Answer) -> Self {
        self.answers.push(answer);
        self
    }

    pub fn do_return<T>(self, value: T) -> Self
        where T: Clone + Send + Sync + 'static
    {
        self.with(Answer::returning(value))
    }

    pub fn do_throw<E>(self, error: E) -> Self
        where E: Clone + fmt::Debug + Send + Sync + 'static
    {
        self.with(Answer::throwing(error))
    }

    pub fn do_answer<T, F>(self, f: F) -> Self
        where T: Send + 'static,
              F: Fn(&Invocation) -> T + Send + Sync + 'static
    {
        self.with(Answer::computing(f))
    }

    pub fn do_nothing(self) -> Self {
        self.with(Answer::returning(()))
    }

    pub fn do_call_real_method(self) -> Self {
        self.with(Answer::call_real_method())
    }

    /// Choose the call these answers apply to.  The selector's method returns
    /// a `Result`, which is an error if an answer does not fit the method.
    pub fn when<M: Mocked>(self, mock: &M) -> M::Calls<DoAnswerSink> {
        M::calls(DoAnswerSink {
            handle: mock.handle().clone(),
            answers: self.answers
        })
    }
}

/// Start a [`DoAnswer`] that returns a clone of `value`.
pub fn do_return<T>(value: T) -> DoAnswer
    where T: Clone + Send + Sync + 'static
{
    DoAnswer { answers: vec![Answer::returning(value)] }
}

/// Start a [`DoAnswer`] that unwinds with `error`.
pub fn do_throw<E>(error: E) -> DoAnswer
    where E: Clone + fmt::Debug + Send + Sync + 'static
{
    DoAnswer { answers: vec![Answer::throwing(error)] }
}

/// Start a [`DoAnswer`] that computes its result.
pub fn do_answer<T, F>(f: F) -> DoAnswer
    where T: Send + 'static,
          F: Fn(&Invocation) -> T + Send + Sync + 'static
{
    DoAnswer { answers: vec![Answer::computing(f)] }
}

/// Start a [`DoAnswer`] for a method returning `()`.
pub fn do_nothing() -> DoAnswer {
    do_return(())
}

/// Start a [`DoAnswer`] that runs a spy's real method.
pub fn do_call_real_method() -> DoAnswer {
    DoAnswer { answers: vec![Answer::call_real_method()] }
}

/// The [`Sink`] behind [`DoAnswer::when`].
pub struct DoAnswerSink {
    handle: MockHandle,
    answers: Vec<Answer>,
}

impl Sink for DoAnswerSink {
    type Output<R: Send + 'static> = Result<()>;

    fn accept<R: Send + 'static>(self, pattern: CallPattern) -> Result<()> {
        for answer in self.answers.iter() {
            answer.check_output::<R>(pattern.method())?;
            if answer.is_call_real_method() && !self.handle.is_spy() {
                return Err(Error::StubbingConfiguration(format!(
                    "{} is not a spy, so {} has no real method to call",
                    self.handle.name(), pattern.method().name)));
            }
        }
        debug!("stubbing {}.{} with {:?}", self.handle.name(), pattern,
               self.answers);
        self.handle.install(None, &pattern, &self.answers);
        Ok(())
    }
}
