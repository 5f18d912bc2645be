// vim: tw=80
//! The context that a family of mocks shares.

use std::{
    any::{self, TypeId},
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
        Mutex
    },
    thread::{self, ThreadId},
    time::Duration
};

use tracing::debug;

use crate::{
    error::{Error, Result},
    handle::MockHandle,
    invocation::{Invocation, MockId},
    matcher::CallPattern,
    stub::OngoingStubbing
};

/// How often timed verifications re-check, unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The unwind payload of a call captured by [`Context::when`] that has no
/// value to return.
pub(crate) struct CallCaptured;

struct CapturedCall {
    handle: MockHandle,
    invocation: Arc<Invocation>,
    returns: TypeId,
}

struct Recording {
    thread: ThreadId,
    call: Option<CapturedCall>,
}

struct Inner {
    sequence: AtomicU64,
    next_mock: AtomicU64,
    recording: AtomicBool,
    capture: Mutex<Option<Recording>>,
    poll_interval: Duration,
}

impl Inner {
    fn stop_recording(&self) -> Option<CapturedCall> {
        let mut capture = self.capture.lock().unwrap();
        self.recording.store(false, Ordering::Release);
        capture.take().and_then(|r| r.call)
    }
}

/// Ends recording mode even if the closure given to [`Context::when`]
/// unwinds.
struct RecordingGuard<'a>(&'a Inner);

impl<'a> RecordingGuard<'a> {
    fn finish(self) -> Option<CapturedCall> {
        self.0.stop_recording()
    }
}

impl<'a> Drop for RecordingGuard<'a> {
    fn drop(&mut self) {
        self.0.stop_recording();
    }
}

/// Owns the global call order and the recording state for a family of
/// mocks.
///
/// Every mock belongs to exactly one context.  Sequence numbers are only
/// comparable among mocks of the same context, so mocks that take part in
/// one [`in_order`](crate::in_order) verification must share it.  Contexts
/// are cheap to clone; clones share their state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// How often timed verifications re-check their condition.
    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn next_mock_id(&self) -> MockId {
        MockId(self.inner.next_mock.fetch_add(1, Ordering::Relaxed))
    }

    /// Called by every mocked method after recording the call.  Returns
    /// whether [`Context::when`] captured it.
    pub(crate) fn observe(
        &self,
        handle: &MockHandle,
        invocation: &Arc<Invocation>,
        returns: TypeId) -> bool
    {
        if !self.inner.recording.load(Ordering::Acquire) {
            return false;
        }
        let mut capture = self.inner.capture.lock().unwrap();
        match capture.as_mut() {
            Some(recording) if recording.thread == thread::current().id() => {
                recording.call = Some(CapturedCall {
                    handle: handle.clone(),
                    invocation: invocation.clone(),
                    returns
                });
                true
            },
            _ => false
        }
    }

    /// Stub a call by making it.
    ///
    /// `f` runs with this context in recording mode.  The last mock call it
    /// makes on this thread becomes the stubbed call, matching exactly the
    /// arguments it was given.  That call is removed from the mock's log.
    /// If the call has neither a stubbed answer nor a default value to
    /// return, it ends the closure early and is the captured call.
    ///
    /// A spy's real method does run while recording.  Use
    /// [`do_return`](crate::do_return) and friends to stub spies without
    /// that side effect.
    ///
    /// ```
    /// # use understudy::*;
    /// #[automock]
    /// trait List {
    ///     fn get(&self, index: usize) -> String;
    /// }
    ///
    /// let ctx = Context::new();
    /// let list = MockList::new(&ctx);
    /// ctx.when(|| list.get(0)).unwrap().then_return("first".to_owned());
    /// assert_eq!("first", list.get(0));
    /// assert_eq!("", list.get(1));
    /// ```
    pub fn when<R, F>(&self, f: F) -> Result<OngoingStubbing<R>>
        where R: Send + 'static,
              F: FnOnce() -> R
    {
        let guard = self.start_recording()?;
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(r) => drop(r),
            Err(payload) if payload.is::<CallCaptured>() => (),
            Err(payload) => panic::resume_unwind(payload)
        }
        let call = guard.finish().ok_or_else(|| {
            Error::StubbingConfiguration(
                "when() was given a closure that called no mock belonging \
                 to this context".to_owned())
        })?;
        if call.returns != TypeId::of::<R>() {
            return Err(Error::StubbingConfiguration(format!(
                "when() was given a closure returning `{}`, but the last mock \
                 call was {}, which returns `{}`", any::type_name::<R>(),
                call.invocation, call.invocation.method().returns)));
        }
        debug!("when() captured {}", call.invocation);
        call.handle.retract(&call.invocation);
        let pattern = CallPattern::from_invocation(&call.invocation);
        Ok(OngoingStubbing::new(call.handle, pattern))
    }

    fn start_recording(&self) -> Result<RecordingGuard<'_>> {
        let mut capture = self.inner.capture.lock().unwrap();
        if capture.is_some() {
            return Err(Error::StubbingConfiguration(
                "when() may not be nested, nor run concurrently on one \
                 context".to_owned()));
        }
        *capture = Some(Recording {
            thread: thread::current().id(),
            call: None
        });
        self.inner.recording.store(true, Ordering::Release);
        Ok(RecordingGuard(&self.inner))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("sequence", &self.inner.sequence.load(Ordering::Relaxed))
            .field("poll_interval", &self.inner.poll_interval)
            .finish()
    }
}

/// Configures a [`Context`].
#[derive(Clone, Debug)]
pub struct ContextBuilder {
    poll_interval: Duration,
}

impl ContextBuilder {
    /// Set the default re-check interval of timed verifications.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> Context {
        Context {
            inner: Arc::new(Inner {
                sequence: AtomicU64::new(0),
                next_mock: AtomicU64::new(0),
                recording: AtomicBool::new(false),
                capture: Mutex::new(None),
                poll_interval: self.poll_interval,
            })
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        ContextBuilder { poll_interval: DEFAULT_POLL_INTERVAL }
    }
}
