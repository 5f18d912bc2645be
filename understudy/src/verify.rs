// vim: tw=80
//! Verification modes, and checking recorded calls against them.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    error::{Error, Result},
    handle::MockHandle,
    invocation::{listing, Invocation},
    matcher::CallPattern,
    mock::{Double, Mocked, Sink},
    timeout::Timeout
};

/// The recorded calls that a [`VerificationMode::Custom`] mode judges.
#[derive(Debug)]
pub struct VerificationData<'a> {
    /// The call being verified.
    pub wanted: &'a CallPattern,
    /// The recorded calls that match `wanted`, in call order.
    pub matching: &'a [Arc<Invocation>],
    /// Every recorded call of the mock, in call order.
    pub all: &'a [Arc<Invocation>],
}

type CustomMode = Arc<
    dyn Fn(&VerificationData<'_>) -> std::result::Result<(), String>
        + Send + Sync
>;

/// How many matching calls a verification expects.
#[derive(Clone)]
pub enum VerificationMode {
    /// Exactly this many.
    Exact(usize),
    /// At least this many.
    AtLeast(usize),
    /// At most this many.
    AtMost(usize),
    /// None at all.
    Never,
    /// The inner mode, within a time limit.
    Timeout(Timeout),
    /// A user-supplied rule, which explains a failure with its `Err`.
    Custom(CustomMode),
}

impl VerificationMode {
    /// ```
    /// # use understudy::*;
    /// let first_arg_ascending = VerificationMode::custom(|data| {
    ///     let firsts: Vec<u32> = data.matching.iter()
    ///         .filter_map(|i| i.arg::<u32>(0).copied())
    ///         .collect();
    ///     if firsts.windows(2).all(|w| w[0] <= w[1]) {
    ///         Ok(())
    ///     } else {
    ///         Err(format!("arguments out of order: {:?}", firsts))
    ///     }
    /// });
    /// # let _ = first_arg_ascending;
    /// ```
    pub fn custom<F>(f: F) -> Self
        where F: Fn(&VerificationData<'_>) -> std::result::Result<(), String>
                 + Send + Sync + 'static
    {
        VerificationMode::Custom(Arc::new(f))
    }

    /// Whether `count` matching calls satisfy a counting mode.
    fn accepts(&self, count: usize) -> bool {
        match self {
            VerificationMode::Exact(n) => count == *n,
            VerificationMode::AtLeast(n) => count >= *n,
            VerificationMode::AtMost(n) => count <= *n,
            VerificationMode::Never => count == 0,
            VerificationMode::Timeout(t) => t.inner().accepts(count),
            VerificationMode::Custom(_) => false,
        }
    }

    /// Judge a mock's calls, without waiting.
    fn judge(&self, data: &VerificationData<'_>)
        -> std::result::Result<(), Option<String>>
    {
        match self {
            VerificationMode::Custom(f) => f(data).map_err(Some),
            VerificationMode::Timeout(t) => t.inner().judge(data),
            m if m.accepts(data.matching.len()) => Ok(()),
            _ => Err(None)
        }
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMode::Exact(n) => write!(f, "times({})", n),
            VerificationMode::AtLeast(n) => write!(f, "at_least({})", n),
            VerificationMode::AtMost(n) => write!(f, "at_most({})", n),
            VerificationMode::Never => write!(f, "never()"),
            VerificationMode::Timeout(t) => {
                write!(f, "timeout({:?}).{}", t.duration(), t.inner())
            },
            VerificationMode::Custom(_) => write!(f, "custom"),
        }
    }
}

impl fmt::Debug for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Exactly `n` calls.
pub fn times(n: usize) -> VerificationMode {
    VerificationMode::Exact(n)
}

/// Exactly one call.  The default for [`timeout`](crate::timeout).
pub fn once() -> VerificationMode {
    times(1)
}

pub fn never() -> VerificationMode {
    VerificationMode::Never
}

pub fn at_least(n: usize) -> VerificationMode {
    VerificationMode::AtLeast(n)
}

pub fn at_least_once() -> VerificationMode {
    at_least(1)
}

pub fn at_most(n: usize) -> VerificationMode {
    VerificationMode::AtMost(n)
}

/// A recorded call of the verified method whose arguments did not match.
#[derive(Debug)]
pub struct NearMiss {
    pub invocation: Arc<Invocation>,
    /// One line per mismatching argument.
    pub reasons: Vec<String>,
}

/// Why a verification failed.
#[derive(Debug)]
pub struct VerificationReport {
    /// The verified mock's name.
    pub mock: String,
    /// The verified call, rendered.
    pub wanted: String,
    pub mode: VerificationMode,
    /// How many recorded calls matched.
    pub actual: usize,
    /// The recorded calls that matched.
    pub matching: Vec<Arc<Invocation>>,
    pub near_misses: Vec<NearMiss>,
    /// A custom mode's explanation.
    pub message: Option<String>,
    /// Whether this was an in-order verification.
    pub in_order: bool,
}

impl VerificationReport {
    pub(crate) fn new(
        handle: &MockHandle,
        pattern: &CallPattern,
        mode: &VerificationMode,
        matching: Vec<Arc<Invocation>>,
        all: &[Arc<Invocation>],
        message: Option<String>,
        in_order: bool) -> Self
    {
        let near_misses = all.iter()
            .filter(|i| pattern.method().same(i.method()) &&
                    !pattern.matches(i))
            .map(|i| NearMiss {
                invocation: i.clone(),
                reasons: pattern.explain(i)
            }).collect();
        VerificationReport {
            mock: handle.name().to_owned(),
            wanted: format!("{}.{}", handle.name(), pattern),
            mode: mode.clone(),
            actual: matching.len(),
            matching,
            near_misses,
            message,
            in_order
        }
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = if self.in_order { " in order" } else { "" };
        write!(f, "Wanted {} {}{}, but it was invoked {} time(s)",
               self.wanted, self.mode, order, self.actual)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        if !self.matching.is_empty() {
            write!(f, "\nMatching invocations:\n{}", listing(&self.matching))?;
        }
        if !self.near_misses.is_empty() {
            write!(f, "\nOther invocations of {}:", self.wanted)?;
            for miss in self.near_misses.iter() {
                write!(f, "\n    {:?}", miss.invocation)?;
                for reason in miss.reasons.iter() {
                    write!(f, "\n        {}", reason)?;
                }
            }
        }
        Ok(())
    }
}

impl MockHandle {
    /// Verify the calls matching `pattern` against `mode`.
    ///
    /// On success every matching call is marked verified and fed to any
    /// captors in `pattern`.
    pub fn verify(&self, pattern: &CallPattern, mode: &VerificationMode)
        -> Result<()>
    {
        match mode {
            VerificationMode::Timeout(t) => {
                t.poll(self.context().poll_interval(),
                       || self.check(pattern, mode))
            },
            _ => self.check(pattern, mode)
        }
    }

    fn check(&self, pattern: &CallPattern, mode: &VerificationMode)
        -> Result<()>
    {
        let all = self.invocations();
        let matching = all.iter()
            .filter(|i| pattern.matches(i))
            .cloned()
            .collect::<Vec<_>>();
        let data = VerificationData {
            wanted: pattern,
            matching: &matching,
            all: &all
        };
        match mode.judge(&data) {
            Ok(()) => {
                for invocation in matching.iter() {
                    invocation.mark_verified();
                    pattern.capture_from(invocation);
                }
                Ok(())
            },
            Err(message) => {
                let report = VerificationReport::new(self, pattern, mode,
                    matching, &all, message, false);
                debug!("verification failed: {}", report);
                Err(Error::VerificationFailure(Box::new(report)))
            }
        }
    }
}

/// The [`Sink`] behind [`verify`].
pub struct VerifySink {
    handle: MockHandle,
    mode: VerificationMode,
}

impl Sink for VerifySink {
    type Output<R: Send + 'static> = Result<()>;

    fn accept<R: Send + 'static>(self, pattern: CallPattern) -> Result<()> {
        self.handle.verify(&pattern, &self.mode)
    }
}

/// Verify that a call happened as many times as `mode` says.
///
/// ```
/// # use understudy::*;
/// #[automock]
/// trait List {
///     fn add(&self, item: String) -> bool;
///     fn clear(&self);
/// }
///
/// let ctx = Context::new();
/// let list = MockList::new(&ctx);
/// list.add("one".to_owned());
/// list.add("two".to_owned());
/// list.add("two".to_owned());
///
/// verify(&list, once()).add("one").unwrap();
/// verify(&list, times(2)).add("two").unwrap();
/// verify(&list, at_least(2)).add(any()).unwrap();
/// verify(&list, never()).clear().unwrap();
/// assert!(verify(&list, times(3)).add("two").is_err());
/// ```
pub fn verify<M: Mocked>(mock: &M, mode: impl Into<VerificationMode>)
    -> M::Calls<VerifySink>
{
    M::calls(VerifySink { handle: mock.handle().clone(), mode: mode.into() })
}

/// Fail if any recorded call of these mocks is not accounted for by a
/// successful verification.
pub fn verify_no_more_interactions(mocks: &[&dyn Double]) -> Result<()> {
    let mut unverified = mocks.iter()
        .flat_map(|m| m.handle().invocations())
        .filter(|i| !i.is_verified())
        .collect::<Vec<_>>();
    if unverified.is_empty() {
        return Ok(());
    }
    unverified.sort_by_key(|i| i.sequence());
    Err(Error::UnverifiedInteractions { invocations: unverified })
}

/// Fail if these mocks recorded any call at all.
pub fn verify_zero_interactions(mocks: &[&dyn Double]) -> Result<()> {
    let mut invocations = mocks.iter()
        .flat_map(|m| m.handle().invocations())
        .collect::<Vec<_>>();
    if invocations.is_empty() {
        return Ok(());
    }
    invocations.sort_by_key(|i| i.sequence());
    Err(Error::UnexpectedInteraction { invocations })
}

/// Synonym for [`verify_zero_interactions`].
pub fn verify_no_interactions(mocks: &[&dyn Double]) -> Result<()> {
    verify_zero_interactions(mocks)
}
