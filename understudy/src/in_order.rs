// vim: tw=80
//! Verifying that calls happened in a particular order.

use std::{
    fmt,
    sync::{Arc, Mutex}
};

use tracing::debug;

use crate::{
    error::{Error, Result},
    handle::MockHandle,
    invocation::Invocation,
    matcher::CallPattern,
    mock::{Double, Mocked, Sink},
    verify::{VerificationData, VerificationMode, VerificationReport}
};

/// An in-order verification session over one or more mocks.
///
/// The session keeps a cursor into the global call order, starting before
/// the first call.  Each successful verification consumes the calls it
/// matched, and moves the cursor past the last of them.  Later
/// verifications only consider calls after the cursor.
///
/// * `times(n)` consumes the first `n` matching calls after the cursor, and
///   fails if there are fewer.  Extra matching calls are left for later
///   verifications.
/// * `at_least(n)` and `at_most(n)` consume the first unbroken run of
///   matching calls, where any call of another mock or method in the session
///   breaks the run.
/// * `never()` fails if any matching call follows the cursor.  It does not
///   move the cursor.
/// * Custom modes judge every matching call after the cursor, and consume
///   them all.
///
/// ```
/// # use understudy::*;
/// #[automock]
/// trait List {
///     fn add(&self, item: String) -> bool;
/// }
///
/// let ctx = Context::new();
/// let first = MockList::new(&ctx);
/// let second = MockList::new(&ctx);
/// first.add("was called first".to_owned());
/// second.add("was called second".to_owned());
///
/// let in_order = in_order(&[&first, &second]);
/// in_order.verify(&first, once()).add("was called first").unwrap();
/// in_order.verify(&second, once()).add("was called second").unwrap();
/// ```
pub struct InOrder {
    mocks: Vec<MockHandle>,
    cursor: Mutex<u64>,
}

/// Start an in-order verification session over `mocks`.  They should all
/// share one [`Context`](crate::Context).
pub fn in_order(mocks: &[&dyn Double]) -> InOrder {
    InOrder {
        mocks: mocks.iter().map(|m| m.handle().clone()).collect(),
        cursor: Mutex::new(0)
    }
}

impl InOrder {
    pub fn verify<M: Mocked>(
        &self,
        mock: &M,
        mode: impl Into<VerificationMode>) -> M::Calls<InOrderSink<'_>>
    {
        M::calls(InOrderSink {
            session: self,
            handle: mock.handle().clone(),
            mode: mode.into()
        })
    }

    /// Fail if any call of the session's mocks is not accounted for by a
    /// successful verification.
    pub fn verify_no_more_interactions(&self) -> Result<()> {
        let mocks = self.mocks.iter()
            .map(|h| h as &dyn Double)
            .collect::<Vec<_>>();
        crate::verify::verify_no_more_interactions(&mocks)
    }

    fn verify_pattern(
        &self,
        handle: &MockHandle,
        pattern: &CallPattern,
        mode: &VerificationMode) -> Result<()>
    {
        if !self.mocks.iter().any(|m| m.id() == handle.id()) {
            return Err(Error::NotInSession { mock: handle.name().to_owned() });
        }
        match mode {
            VerificationMode::Timeout(t) => {
                t.poll(handle.context().poll_interval(),
                       || self.check(handle, pattern, t.inner(), mode))
            },
            _ => self.check(handle, pattern, mode, mode)
        }
    }

    /// Consume the calls that `mode` accepts.  Failures are reported as a
    /// failure of `reported`, which may be a timed wrapper of `mode`.
    fn check(
        &self,
        handle: &MockHandle,
        pattern: &CallPattern,
        mode: &VerificationMode,
        reported: &VerificationMode) -> Result<()>
    {
        let mut cursor = self.cursor.lock().unwrap();
        let all = handle.invocations();
        let pending = all.iter()
            .filter(|i| i.sequence() >= *cursor && pattern.matches(i))
            .cloned()
            .collect::<Vec<_>>();
        let consumed = match mode {
            VerificationMode::Never | VerificationMode::Exact(0) => {
                if pending.is_empty() { Ok(Vec::new()) } else { Err(None) }
            },
            VerificationMode::Exact(n) => {
                if pending.len() >= *n {
                    Ok(pending[..*n].to_vec())
                } else {
                    Err(None)
                }
            },
            VerificationMode::AtLeast(n) | VerificationMode::AtMost(n) => {
                let run = self.first_run(handle, pattern, *cursor);
                let ok = match mode {
                    VerificationMode::AtLeast(_) => run.len() >= *n,
                    _ => run.len() <= *n
                };
                if ok { Ok(run) } else { Err(None) }
            },
            VerificationMode::Custom(f) => {
                let data = VerificationData {
                    wanted: pattern,
                    matching: &pending,
                    all: &all
                };
                f(&data).map(|_| pending.clone()).map_err(Some)
            },
            VerificationMode::Timeout(t) => {
                drop(cursor);
                return self.check(handle, pattern, t.inner(), reported);
            }
        };
        match consumed {
            Ok(consumed) => {
                for invocation in consumed.iter() {
                    invocation.mark_verified();
                    pattern.capture_from(invocation);
                }
                if let Some(last) = consumed.last() {
                    *cursor = last.sequence() + 1;
                }
                Ok(())
            },
            Err(message) => {
                let report = VerificationReport::new(handle, pattern,
                    reported, pending, &all, message, true);
                debug!("in-order verification failed: {}", report);
                Err(Error::VerificationFailure(Box::new(report)))
            }
        }
    }

    /// The first unbroken run of calls matching `pattern` at or after
    /// `cursor`, in the merged call order of every mock in the session.
    fn first_run(&self, handle: &MockHandle, pattern: &CallPattern,
                 cursor: u64) -> Vec<Arc<Invocation>>
    {
        let mut log = self.mocks.iter()
            .flat_map(MockHandle::invocations)
            .filter(|i| i.sequence() >= cursor)
            .collect::<Vec<_>>();
        log.sort_by_key(|i| i.sequence());
        let is_wanted = |i: &Arc<Invocation>| {
            i.mock() == handle.id() && pattern.matches(i)
        };
        log.into_iter()
            .skip_while(|i| !is_wanted(i))
            .take_while(|i| is_wanted(i))
            .collect()
    }
}

impl fmt::Debug for InOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InOrder")
            .field("mocks", &self.mocks)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// The [`Sink`] behind [`InOrder::verify`].
pub struct InOrderSink<'a> {
    session: &'a InOrder,
    handle: MockHandle,
    mode: VerificationMode,
}

impl<'a> Sink for InOrderSink<'a> {
    type Output<R: Send + 'static> = Result<()>;

    fn accept<R: Send + 'static>(self, pattern: CallPattern) -> Result<()> {
        self.session.verify_pattern(&self.handle, &pattern, &self.mode)
    }
}
