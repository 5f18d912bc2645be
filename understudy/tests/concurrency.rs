// vim: tw=80
//! Mocks shared between threads.

use std::{
    sync::{Arc, Weak},
    thread
};

use static_assertions::assert_impl_all;
use understudy::*;

#[automock]
trait Counter {
    fn hit(&self, n: u32);
}

#[automock]
trait Fib {
    fn fib(&self, n: u32) -> u64;
}

assert_impl_all!(MockCounter: Send, Sync);
assert_impl_all!(Context: Send, Sync, Clone);
assert_impl_all!(MockHandle: Send, Sync, Clone);
assert_impl_all!(Invocation: Send, Sync);
assert_impl_all!(Error: Send, Sync, std::error::Error);
assert_impl_all!(CancelToken: Send, Sync);

#[test]
fn calls_from_many_threads() {
    let ctx = Context::new();
    let a = Arc::new(MockCounter::new(&ctx));
    let b = Arc::new(MockCounter::new(&ctx));
    let workers = (0..4).map(|t| {
        let a = a.clone();
        let b = b.clone();
        thread::spawn(move || {
            for i in 0..100 {
                a.hit(t * 1000 + i);
                b.hit(i);
            }
        })
    }).collect::<Vec<_>>();
    for worker in workers {
        worker.join().unwrap();
    }

    verify(&*a, times(400)).hit(any()).unwrap();
    verify(&*b, times(4)).hit(0).unwrap();

    let a_log = a.handle().invocations();
    let b_log = b.handle().invocations();
    for log in [&a_log, &b_log] {
        assert!(log.windows(2).all(|w| w[0].sequence() < w[1].sequence()));
    }
    let mut sequences = a_log.iter()
        .chain(b_log.iter())
        .map(|i| i.sequence())
        .collect::<Vec<_>>();
    sequences.sort_unstable();
    sequences.dedup();
    assert_eq!(800, sequences.len());
    assert_eq!(1, sequences[0]);
    assert_eq!(800, sequences[799]);
}

#[test]
fn answers_may_call_back_into_the_mock() {
    let ctx = Context::new();
    let fib = Arc::new(MockFib::new(&ctx));
    let this: Weak<MockFib> = Arc::downgrade(&fib);
    stub(&*fib).fib(any()).then_answer(move |i| {
        let n = *i.arg::<u32>(0).unwrap();
        if n < 2 {
            u64::from(n)
        } else {
            let fib = this.upgrade().unwrap();
            fib.fib(n - 1) + fib.fib(n - 2)
        }
    });
    assert_eq!(55, fib.fib(10));
    verify(&*fib, at_least(10)).fib(any()).unwrap();
}

#[test]
fn stubbing_while_calling() {
    let ctx = Context::new();
    let fib = Arc::new(MockFib::new(&ctx));
    let caller = {
        let fib = fib.clone();
        thread::spawn(move || {
            for _ in 0..1000 {
                let v = fib.fib(1);
                assert!(v == 0 || v == 1, "{}", v);
            }
        })
    };
    for _ in 0..100 {
        stub(&*fib).fib(1).then_return(1);
    }
    caller.join().unwrap();
    assert_eq!(1, fib.fib(1));
    assert_eq!(1, mocking_details(&*fib).stubbings);
}

#[test]
fn single_threaded_answers_stay_home() {
    let ctx = Context::new();
    let counter = Arc::new(MockCounter::new(&ctx));
    stub(&*counter).hit(any()).then_answer_st(|_| ());
    counter.hit(1);
    let other = {
        let counter = counter.clone();
        thread::spawn(move || counter.hit(2))
    };
    assert!(other.join().is_err());
}
