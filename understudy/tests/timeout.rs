// vim: tw=80
//! Verifications that wait for calls from other threads.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant}
};

use understudy::*;

#[automock]
trait Queue {
    fn put(&self, n: u32);
}

fn spawn_puts(queue: &Arc<MockQueue>, delay: Duration, values: Vec<u32>)
    -> thread::JoinHandle<()>
{
    let queue = queue.clone();
    thread::spawn(move || {
        for n in values {
            thread::sleep(delay);
            queue.put(n);
        }
    })
}

#[test]
fn waits_for_calls() {
    let ctx = Context::new();
    let queue = Arc::new(MockQueue::new(&ctx));
    let worker = spawn_puts(&queue, Duration::from_millis(10), vec![1, 2, 3]);
    verify(&*queue, timeout(Duration::from_secs(5)).times(3))
        .put(any())
        .unwrap();
    worker.join().unwrap();
}

#[test]
fn default_inner_mode_is_once() {
    let ctx = Context::new();
    let queue = Arc::new(MockQueue::new(&ctx));
    let worker = spawn_puts(&queue, Duration::from_millis(10), vec![7]);
    verify(&*queue, timeout(Duration::from_secs(5))).put(7).unwrap();
    worker.join().unwrap();
}

#[test]
fn expires() {
    let ctx = Context::new();
    let queue = MockQueue::new(&ctx);
    let started = Instant::now();
    let e = verify(&queue, timeout(Duration::from_millis(50)))
        .put(any())
        .unwrap_err();
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(e.to_string().starts_with(
        "Wanted queue.put(any()) timeout(50ms).times(1), but it was \
         invoked 0 time(s)"),
        "{}", e);
}

#[test]
fn at_least_within_the_limit() {
    let ctx = Context::new();
    let queue = Arc::new(MockQueue::new(&ctx));
    let worker = spawn_puts(&queue, Duration::from_millis(5), vec![1, 2]);
    verify(&*queue, timeout(Duration::from_secs(5)).at_least(2))
        .put(any())
        .unwrap();
    worker.join().unwrap();
}

#[test]
fn passes_immediately() {
    let ctx = Context::builder()
        .poll_interval(Duration::from_secs(60))
        .build();
    let queue = MockQueue::new(&ctx);
    queue.put(1);
    let started = Instant::now();
    verify(&queue, timeout(Duration::from_secs(60))).put(1).unwrap();
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[test]
fn cancel() {
    let ctx = Context::new();
    let queue = MockQueue::new(&ctx);
    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            token.cancel();
        })
    };
    let started = Instant::now();
    let r = verify(&queue, timeout(Duration::from_secs(30)).cancel_on(&token))
        .put(any());
    assert!(r.is_err());
    assert!(token.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(10));
    canceller.join().unwrap();
}

#[test]
fn cancel_interrupts_a_long_poll() {
    let ctx = Context::builder()
        .poll_interval(Duration::from_secs(60))
        .build();
    let queue = MockQueue::new(&ctx);
    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            token.cancel();
        })
    };
    let started = Instant::now();
    let e = verify(&queue, timeout(Duration::from_secs(120)).cancel_on(&token))
        .put(any())
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(e.to_string().starts_with(
        "Wanted queue.put(any()) timeout(120s).times(1)"), "{}", e);
    canceller.join().unwrap();
}

#[test]
fn poll_every() {
    let ctx = Context::builder()
        .poll_interval(Duration::from_secs(60))
        .build();
    assert_eq!(Duration::from_secs(60), ctx.poll_interval());
    let queue = Arc::new(MockQueue::new(&ctx));
    let worker = spawn_puts(&queue, Duration::from_millis(10), vec![1]);
    let started = Instant::now();
    verify(&*queue, timeout(Duration::from_secs(20))
                    .poll_every(Duration::from_millis(5)))
        .put(1)
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    worker.join().unwrap();
}

#[test]
fn never_within_the_limit() {
    let ctx = Context::new();
    let queue = MockQueue::new(&ctx);
    queue.put(1);
    // A mode that is already satisfied passes on the first check
    verify(&queue, timeout(Duration::from_secs(5)).never()).put(2).unwrap();
    let e = verify(&queue, timeout(Duration::from_millis(20)).never())
        .put(1)
        .unwrap_err();
    assert!(e.to_string().contains("timeout(20ms).never()"), "{}", e);
}

#[test]
fn default_poll_interval() {
    assert_eq!(DEFAULT_POLL_INTERVAL, Context::new().poll_interval());
}
