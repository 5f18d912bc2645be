// vim: tw=80
//! Verification that waits for calls made by other threads.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc
    },
    thread,
    time::{Duration, Instant}
};

use tracing::{debug, trace};

use crate::{
    error::Result,
    verify::{self, VerificationMode}
};

/// The longest a cancellable wait sleeps between looks at its token.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(5);

/// Cancels a pending timed verification from another thread.
///
/// A cancelled verification stops waiting and reports its most recent
/// failure.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A verification mode that may be satisfied within a time limit.
///
/// Created by [`timeout`].  The inner mode defaults to `times(1)`.
#[derive(Clone, Debug)]
pub struct Timeout {
    duration: Duration,
    inner: Box<VerificationMode>,
    poll_interval: Option<Duration>,
    cancel: Option<CancelToken>,
}

/// Wait up to `duration` for a verification to pass.
///
/// ```
/// # use understudy::*;
/// # use std::{thread, time::Duration};
/// #[automock]
/// trait Queue {
///     fn put(&self, n: u32);
/// }
///
/// let ctx = Context::new();
/// let queue = std::sync::Arc::new(MockQueue::new(&ctx));
/// let worker = {
///     let queue = queue.clone();
///     thread::spawn(move || { queue.put(1); queue.put(2); })
/// };
/// verify(&*queue, timeout(Duration::from_secs(5)).times(2))
///     .put(any())
///     .unwrap();
/// worker.join().unwrap();
/// ```
pub fn timeout(duration: Duration) -> Timeout {
    Timeout {
        duration,
        inner: Box::new(verify::times(1)),
        poll_interval: None,
        cancel: None
    }
}

impl Timeout {
    fn with(mut self, mode: VerificationMode) -> Self {
        self.inner = Box::new(mode);
        self
    }

    pub fn times(self, n: usize) -> Self {
        self.with(verify::times(n))
    }

    pub fn never(self) -> Self {
        self.with(verify::never())
    }

    pub fn at_least(self, n: usize) -> Self {
        self.with(verify::at_least(n))
    }

    pub fn at_least_once(self) -> Self {
        self.with(verify::at_least_once())
    }

    pub fn at_most(self, n: usize) -> Self {
        self.with(verify::at_most(n))
    }

    /// Use any other mode, such as a custom one.
    pub fn mode(self, mode: impl Into<VerificationMode>) -> Self {
        self.with(mode.into())
    }

    /// Re-check every `interval` instead of at the context's poll interval.
    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn cancel_on(mut self, token: &CancelToken) -> Self {
        self.cancel = Some(token.clone());
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn inner(&self) -> &VerificationMode {
        &self.inner
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancelToken::is_cancelled)
    }

    /// Run `check` until it passes, the deadline expires, or the token is
    /// cancelled.  No locks are held while sleeping, and the final sleep ends
    /// at the deadline, so one more check always follows it.
    pub(crate) fn poll<F>(&self, default_interval: Duration, mut check: F)
        -> Result<()>
        where F: FnMut() -> Result<()>
    {
        let interval = self.poll_interval.unwrap_or(default_interval);
        let started = Instant::now();
        loop {
            let failure = match check() {
                Ok(()) => return Ok(()),
                Err(e) => e
            };
            if self.is_cancelled() {
                debug!("timed verification cancelled");
                return Err(failure);
            }
            let elapsed = started.elapsed();
            if elapsed >= self.duration {
                debug!(?elapsed, "timed verification expired");
                return Err(failure);
            }
            trace!(?elapsed, "timed verification not yet satisfied");
            self.sleep_until(
                Instant::now() + interval.min(self.duration - elapsed));
        }
    }

    /// Sleep until `wake`, or until cancelled if there is a token.
    fn sleep_until(&self, wake: Instant) {
        loop {
            let now = Instant::now();
            if now >= wake || self.is_cancelled() {
                return;
            }
            let remaining = wake - now;
            thread::sleep(match self.cancel {
                Some(_) => remaining.min(CANCEL_CHECK_INTERVAL),
                None => remaining
            });
        }
    }
}

impl From<Timeout> for VerificationMode {
    fn from(timeout: Timeout) -> Self {
        VerificationMode::Timeout(timeout)
    }
}
