// vim: tw=80
//! Method descriptors and the invocation log.

use std::{
    fmt,
    ptr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        RwLock,
        RwLockWriteGuard
    }
};

use tracing::trace;

use crate::{context::Context, value::{Arg, Value}};

/// Identifies one mock within its [`Context`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MockId(pub(crate) u64);

/// Static description of one mockable method.
///
/// Generated mocks emit one `static` of this type per method.
#[derive(Debug)]
pub struct MethodSignature {
    /// The trait declaring the method.
    pub contract: &'static str,
    /// The method's name.
    pub name: &'static str,
    /// Parameter types, as recorded.
    pub params: &'static [&'static str],
    /// The return type.
    pub returns: &'static str,
}

impl MethodSignature {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Two signatures denote the same method if they are the same static, or
    /// name the same method of the same trait.
    pub fn same(&self, other: &MethodSignature) -> bool {
        ptr::eq(self, other) ||
            (self.contract == other.contract && self.name == other.name)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}({}) -> {}", self.contract, self.name,
               self.params.join(", "), self.returns)
    }
}

/// Every method a mock type answers to.
#[derive(Debug)]
pub struct MethodSet {
    /// The mock's base name.  Mocks are named after it unless
    /// [`MockOptions::name`](crate::MockOptions::name) says otherwise.
    pub name: &'static str,
    /// The traits that the mock implements.
    pub traits: &'static [&'static str],
    pub methods: &'static [&'static MethodSignature],
}

impl MethodSet {
    /// Look up a method by its bare name or as `Trait::method`.
    pub fn find(&self, name: &str) -> Option<&'static MethodSignature> {
        self.methods.iter()
            .copied()
            .find(|m| {
                m.name == name ||
                    name.split_once("::")
                    .map_or(false, |(c, n)| c == m.contract && n == m.name)
            })
    }

    pub fn contains(&self, method: &MethodSignature) -> bool {
        self.methods.iter().any(|m| m.same(method))
    }
}

/// One recorded call on a mock.
pub struct Invocation {
    mock: MockId,
    mock_name: Arc<str>,
    method: &'static MethodSignature,
    args: Vec<Arg>,
    sequence: u64,
    verified: AtomicBool,
}

impl Invocation {
    /// The mock that received the call.
    pub fn mock(&self) -> MockId {
        self.mock
    }

    pub fn mock_name(&self) -> &str {
        &self.mock_name
    }

    pub fn method(&self) -> &'static MethodSignature {
        self.method
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Fetch one argument with its concrete type.
    ///
    /// Returns `None` if `index` is out of range or the argument is not a
    /// `T`.
    pub fn arg<T: Value>(&self, index: usize) -> Option<&T> {
        self.args.get(index)?.downcast_ref::<T>().ok()
    }

    /// Position of this call in its [`Context`]'s global order.  Sequence
    /// numbers start at 1 and strictly increase in the order that calls were
    /// recorded, across every mock of the context.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether some successful verification has accounted for this call.
    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }

    pub(crate) fn mark_verified(&self) {
        self.verified.store(true, Ordering::Release);
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.mock_name, self.method.name)?;
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", a)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.sequence, self)
    }
}

/// Render a list of invocations, one per line.
pub(crate) fn listing(invocations: &[Arc<Invocation>]) -> String {
    invocations.iter()
        .map(|i| format!("    {:?}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The append-only log of one mock's calls.
#[derive(Default)]
pub(crate) struct Recorder {
    log: RwLock<Vec<Arc<Invocation>>>,
}

impl Recorder {
    /// Append a call.  The sequence number is drawn while the write lock is
    /// held, so each mock's log is always sorted by sequence.
    pub(crate) fn append(
        &self,
        ctx: &Context,
        mock: MockId,
        mock_name: &Arc<str>,
        method: &'static MethodSignature,
        args: Vec<Arg>) -> Arc<Invocation>
    {
        let mut log = self.log.write().unwrap();
        let invocation = Arc::new(Invocation {
            mock,
            mock_name: mock_name.clone(),
            method,
            args,
            sequence: ctx.next_sequence(),
            verified: AtomicBool::new(false),
        });
        trace!(sequence = invocation.sequence, "recorded {}", invocation);
        log.push(invocation.clone());
        invocation
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Invocation>> {
        self.log.read().unwrap().clone()
    }

    /// Remove one call, identified by its sequence number.
    pub(crate) fn retract(&self, sequence: u64) {
        self.log.write().unwrap().retain(|i| i.sequence != sequence);
    }

    pub(crate) fn clear(&self) {
        self.log.write().unwrap().clear();
    }

    /// Exclusive access to the log, for operations that must also lock other
    /// state.
    pub(crate) fn lock(&self) -> RwLockWriteGuard<'_, Vec<Arc<Invocation>>> {
        self.log.write().unwrap()
    }
}
