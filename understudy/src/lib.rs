// vim: tw=80
//! Record-and-verify test doubles for Rust traits.
//!
//! Understudy creates mock and spy versions of traits.  Unlike a mock that
//! must be told up front what to expect, an understudy mock accepts any call,
//! records it, and answers it with a stubbed or default value.  The test
//! checks what happened afterwards.
//!
//! # Usage
//!
//! * Create a mock struct with [`#[automock]`](automock) on a trait, or with
//!   [`mock!`] for several traits at once.  Its name is the trait's, with
//!   "Mock" prepended.
//! * Create a [`Context`], and instantiate the mock with `MockFoo::new(&ctx)`.
//!   Mocks that will be verified together in order must share a context.
//! * Optionally stub some calls with [`stub`], [`Context::when`], or the
//!   [`do_return`] family.  Unstubbed calls return default values.
//! * Supply the mock to the code under test.
//! * Check what happened with [`verify`], [`in_order`], and
//!   [`verify_no_more_interactions`].  Verifications return a `Result`, so
//!   tests usually `unwrap` them.
//!
//! # User Guide
//!
//! * [`Getting started`](#getting-started)
//! * [`Stubbing`](#stubbing)
//! * [`Matching arguments`](#matching-arguments)
//! * [`Verification`](#verification)
//! * [`Spies`](#spies)
//! * [`Waiting for other threads`](#waiting-for-other-threads)
//! * [`Multiple traits`](#multiple-traits)
//! * [`Limitations`](#limitations)
//!
//! ## Getting Started
//! ```
//! use understudy::*;
//!
//! #[automock]
//! trait List {
//!     fn add(&self, item: String) -> bool;
//!     fn get(&self, index: usize) -> String;
//!     fn size(&self) -> usize;
//! }
//!
//! let ctx = Context::new();
//! let list = MockList::new(&ctx);
//!
//! // Unstubbed calls return default values
//! assert!(!list.add("one".to_owned()));
//! assert_eq!(0, list.size());
//!
//! stub(&list).size().then_return(100);
//! assert_eq!(100, list.size());
//!
//! verify(&list, once()).add("one").unwrap();
//! verify(&list, times(2)).size().unwrap();
//! ```
//!
//! ## Stubbing
//!
//! A stubbing holds a list of answers.  Successive matching calls use them
//! in order, and the last one repeats.  When several stubbings match a call,
//! the most recent wins.
//!
//! ```
//! # use understudy::*;
//! # #[automock]
//! # trait List {
//! #     fn get(&self, index: usize) -> String;
//! # }
//! let ctx = Context::new();
//! let list = MockList::new(&ctx);
//! stub(&list).get(any())
//!     .then_return("anything".to_owned());
//! stub(&list).get(0)
//!     .then_return_values(["first".to_owned(), "again".to_owned()]);
//!
//! assert_eq!("first", list.get(0));
//! assert_eq!("again", list.get(0));
//! assert_eq!("again", list.get(0));
//! assert_eq!("anything", list.get(7));
//! ```
//!
//! Answers may also be computed from the [`Invocation`], or "thrown".  A
//! thrown error unwinds from the mocked call with the error as its panic
//! payload.
//!
//! ```
//! # use understudy::*;
//! # #[automock]
//! # trait List {
//! #     fn get(&self, index: usize) -> String;
//! # }
//! # let ctx = Context::new();
//! # let list = MockList::new(&ctx);
//! stub(&list).get(any())
//!     .then_answer(|i| format!("item {}", i.arg::<usize>(0).unwrap()));
//! assert_eq!("item 3", list.get(3));
//!
//! stub(&list).get(99).then_throw("index out of bounds");
//! let r = std::panic::catch_unwind(|| list.get(99));
//! assert_eq!(Some(&"index out of bounds"),
//!            r.unwrap_err().downcast_ref::<&str>());
//! ```
//!
//! [`Context::when`] stubs a call by making it, and the `do_*` functions
//! choose the answer before the call.  The latter suit spies, whose real
//! method would otherwise run while `when` records the call.
//!
//! ```
//! # use understudy::*;
//! # #[automock]
//! # trait List {
//! #     fn get(&self, index: usize) -> String;
//! #     fn clear(&self);
//! # }
//! # let ctx = Context::new();
//! # let list = MockList::new(&ctx);
//! ctx.when(|| list.get(1)).unwrap().then_return("one".to_owned());
//! do_throw("read only").when(&list).clear().unwrap();
//! assert_eq!("one", list.get(1));
//! assert!(std::panic::catch_unwind(|| list.clear()).is_err());
//! ```
//!
//! ## Matching arguments
//!
//! Call selectors take one matcher per argument.  A plain value means
//! [`eq`].  The others are [`any`], [`any_of_type`], [`arg_that`] with any
//! [`Predicate`], [`arg_where`] with a closure, and [`Captor::capture`].
//!
//! ```
//! # use understudy::*;
//! # #[automock]
//! # trait Dao {
//! #     fn update(&self, id: u32, name: String) -> bool;
//! # }
//! let ctx = Context::new();
//! let dao = MockDao::new(&ctx);
//! stub(&dao).update(arg_that(predicate::lt(100u32)), any())
//!     .then_return(true);
//! assert!(dao.update(1, "ann".to_owned()));
//! assert!(!dao.update(100, "bob".to_owned()));
//!
//! let names = Captor::new();
//! verify(&dao, times(2)).update(any(), names.capture()).unwrap();
//! assert_eq!(vec!["ann".to_owned(), "bob".to_owned()], names.all_values());
//! ```
//!
//! ## Verification
//!
//! [`verify`] counts the calls that match, according to a
//! [`VerificationMode`]: [`times`], [`once`], [`never`], [`at_least`],
//! [`at_least_once`], [`at_most`], [`timeout`], or a custom mode.  A
//! successful verification marks the calls it matched as verified, so that
//! [`verify_no_more_interactions`] can find the ones that weren't.
//! [`in_order`] checks the relative order of calls, across several mocks.
//! A failure's report lists the matching calls, and the calls of the same
//! method whose arguments did not match, along with the reasons.
//!
//! ```
//! # use understudy::*;
//! # #[automock]
//! # trait List {
//! #     fn add(&self, item: String) -> bool;
//! #     fn clear(&self);
//! # }
//! let ctx = Context::new();
//! let list = MockList::new(&ctx);
//! list.add("one".to_owned());
//! list.clear();
//!
//! let in_order = in_order(&[&list]);
//! in_order.verify(&list, once()).add("one").unwrap();
//! in_order.verify(&list, once()).clear().unwrap();
//! verify_no_more_interactions(&[&list]).unwrap();
//!
//! let e = verify(&list, once()).add("two").unwrap_err();
//! assert!(e.to_string().contains(r#"argument 0: expected "two", was "one""#));
//! ```
//!
//! ## Spies
//!
//! A spy wraps a real object.  Unstubbed calls go to the real object, and
//! every call is recorded just like a mock's.
//!
//! ```
//! # use understudy::*;
//! #[automock]
//! trait Counter {
//!     fn next(&mut self) -> u32;
//! }
//!
//! struct Real(u32);
//! impl Counter for Real {
//!     fn next(&mut self) -> u32 {
//!         self.0 += 1;
//!         self.0
//!     }
//! }
//!
//! let ctx = Context::new();
//! let mut spy = MockCounter::spy(&ctx, Real(0));
//! assert_eq!(1, spy.next());
//! do_return(42u32).when(&spy).next().unwrap();
//! assert_eq!(42, spy.next());
//! verify(&spy, times(2)).next().unwrap();
//! assert!(mocking_details(&spy).is_spy);
//! ```
//!
//! ## Waiting for other threads
//!
//! [`timeout`] wraps another mode, and polls until it passes or the time runs
//! out.  Its poll interval comes from the [`Context`], and a [`CancelToken`]
//! can stop it early.
//!
//! ## Multiple traits
//!
//! [`mock!`] defines one mock implementing several traits.  The method
//! declarations are repeated inside the macro.
//!
//! ```
//! # use understudy::*;
//! trait Reader {
//!     fn read(&self, key: String) -> Option<String>;
//! }
//! trait Writer {
//!     fn write(&self, key: String, value: String);
//! }
//!
//! mock! {
//!     Store;
//!     trait Reader {
//!         fn read(&self, key: String) -> Option<String>;
//!     }
//!     trait Writer {
//!         fn write(&self, key: String, value: String);
//!     }
//! }
//!
//! let ctx = Context::new();
//! let store = MockStore::new(&ctx);
//! store.write("k".to_owned(), "v".to_owned());
//! assert_eq!(None, store.read("k".to_owned()));
//! verify(&store, once()).write("k", any()).unwrap();
//! ```
//!
//! ## Limitations
//!
//! Mocked traits must be object safe and non-generic, without associated
//! types or constants.  Methods must take `&self` or `&mut self`, and must not
//! be generic or `async`.  Parameters may be `'static` values or top-level
//! references, which are recorded as owned copies, so they must be [`Value`]s
//! and `Clone` (or `ToOwned`, for references).  Return values must be
//! `'static` and `Send`, and for [`then_return`] they must also be `Clone`.
//! The macros reject anything else at compile time.
//!
//! [`then_return`]: OngoingStubbing::then_return
//!
//! # Logging
//!
//! Understudy logs through [`tracing`].  Mock creation, stubbing, resets and
//! failed verifications are logged at `debug` level, and each recorded call
//! and timeout poll at `trace` level.

mod answer;
mod context;
mod error;
mod handle;
mod in_order;
mod invocation;
mod matcher;
mod mock;
mod stub;
mod timeout;
mod value;
mod verify;

pub use understudy_derive::{automock, mock};
pub use predicates::prelude::{Predicate, predicate};

pub use crate::{
    answer::{Answer, DefaultAnswer},
    context::{Context, ContextBuilder, DEFAULT_POLL_INTERVAL},
    error::Error,
    handle::{MockHandle, MockOptions, MockingDetails},
    in_order::{in_order, InOrder, InOrderSink},
    invocation::{Invocation, MethodSet, MethodSignature, MockId},
    matcher::{
        any,
        any_of_type,
        arg_that,
        arg_where,
        eq,
        is_a,
        ArgMatcher,
        CallPattern,
        Captor,
        Matcher
    },
    mock::{
        create_mock,
        create_spy,
        create_spy_with_options,
        Double,
        Mock,
        Mocked,
        Sink
    },
    stub::{
        do_answer,
        do_call_real_method,
        do_nothing,
        do_return,
        do_throw,
        DoAnswer,
        DoAnswerSink,
        OngoingStubbing,
        StubSink
    },
    timeout::{timeout, CancelToken, Timeout},
    value::{arg, reply, Arg, Reply, Value},
    verify::{
        at_least,
        at_least_once,
        at_most,
        never,
        once,
        times,
        verify,
        verify_no_interactions,
        verify_no_more_interactions,
        verify_zero_interactions,
        NearMiss,
        VerificationData,
        VerificationMode,
        VerificationReport,
        VerifySink
    }
};

#[doc(hidden)]
pub use crate::value::{DefaultReturner, ReturnDefault, ReturnNoDefault};

/// Stub a call.
///
/// Returns a call selector.  Choose the call and its argument matchers, then
/// supply answers with the `then_*` methods of [`OngoingStubbing`].
pub fn stub<M: Mocked>(mock: &M) -> M::Calls<StubSink> {
    M::calls(StubSink::new(mock.handle().clone()))
}

/// Forget every stubbing and recorded call of each mock.
pub fn reset(mocks: &[&dyn Double]) {
    for mock in mocks {
        mock.handle().reset();
    }
}

/// Forget every recorded call of each mock, keeping the stubbings.
pub fn clear_invocations(mocks: &[&dyn Double]) {
    for mock in mocks {
        mock.handle().clear_invocations();
    }
}

/// Inspect a mock.
pub fn mocking_details(mock: &dyn Double) -> MockingDetails {
    MockingDetails::of(mock.handle())
}
