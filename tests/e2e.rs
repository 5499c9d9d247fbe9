//! End-to-end scenarios exercising the public API the way a cooperative
//! runtime would.
use hypha::{
    rate_limit::{Limit, POLL_INTERVAL},
    time::{Clock, Ticks, Timer},
    Deferred, Lock, PriorityQueue, Queue, RateLimiter, UnorderedWorkQueue,
};
use std::cell::Cell;
use tokio_test::{assert_pending, assert_ready, assert_ready_eq, task};

#[test]
fn lock_baton_passing() {
    let lock = Lock::new();

    // Hold the lock, then line up two contenders.
    assert_ready!(task::spawn(lock.acquire()).poll());
    let mut a1 = task::spawn(lock.acquire());
    let mut a2 = task::spawn(lock.acquire());
    assert_pending!(a1.poll());
    assert_pending!(a2.poll());

    lock.release().unwrap();
    assert_ready!(a1.poll());
    assert!(lock.is_locked());

    lock.release().unwrap();
    assert_ready!(a2.poll());
    assert!(lock.is_locked());

    lock.release().unwrap();
    assert!(!lock.is_locked());
}

#[test]
fn priority_queue_ordering() {
    let queue = PriorityQueue::new(0);
    queue.put_nowait("last", 20).unwrap();
    queue.put_nowait("first", 10).unwrap();
    queue.put_nowait("middle", 15).unwrap();

    let mut get = task::spawn(queue.get());
    assert_ready_eq!(get.poll(), "first");
    let mut get = task::spawn(queue.get());
    assert_ready_eq!(get.poll(), "middle");
    let mut get = task::spawn(queue.get());
    assert_ready_eq!(get.poll(), "last");
}

#[test]
fn threshold_wait_survives_a_cancelled_peer() {
    let queue = Queue::fifo(0);

    let mut w1 = task::spawn(queue.wait_len(1));
    let mut w2 = task::spawn(queue.wait_len(1));
    let mut w3 = task::spawn(queue.wait_len(1));
    assert_pending!(w1.poll());
    assert_pending!(w2.poll());
    assert_pending!(w3.poll());

    // Cancel the middle waiter; its slot in the wait list must not absorb
    // a wakeup.
    drop(w2);

    queue.put_nowait(1).unwrap();
    queue.put_nowait(2).unwrap();

    assert!(w1.is_woken());
    assert_ready!(w1.poll());
    assert!(w3.is_woken());
    assert_ready!(w3.poll());
    assert_eq!(queue.len(), 2);
}

#[test]
fn work_queue_max_pending_backpressure() {
    let queue: UnorderedWorkQueue<u32, hypha::Cancelled> =
        UnorderedWorkQueue::<u32, hypha::Cancelled>::builder()
            .max_pending(1)
            .build();
    let d1 = Deferred::new();
    let d2 = Deferred::new();

    let mut p1 = task::spawn(queue.put(d1.wait()));
    assert_ready_eq!(p1.poll(), 0);

    let mut p2 = task::spawn(queue.put(d2.wait()));
    assert_pending!(p2.poll());

    d1.settle(1).unwrap();
    assert!(p2.is_woken());
    assert_ready_eq!(p2.poll(), 1);
    assert_eq!(queue.pending(), 1);
    assert_eq!(queue.fulfilled(), 1);

    d2.settle(2).unwrap();
    let mut get = task::spawn(queue.get());
    assert_ready_eq!(get.poll(), Ok(1));
    let mut get = task::spawn(queue.get());
    assert_ready_eq!(get.poll(), Ok(2));
    assert_eq!(queue.pending(), 0);
    assert_eq!(queue.fulfilled(), 0);
}

#[test]
fn work_queue_max_fulfilled_backpressure() {
    let queue: UnorderedWorkQueue<u32, hypha::Cancelled> =
        UnorderedWorkQueue::<u32, hypha::Cancelled>::builder()
            .max_fulfilled(1)
            .build();

    let settled = Deferred::new();
    settled.settle(1).unwrap();
    let mut p1 = task::spawn(queue.put(settled.wait()));
    assert_ready_eq!(p1.poll(), 0);
    assert_eq!(queue.fulfilled(), 1);

    let second = Deferred::new();
    second.settle(2).unwrap();
    let mut p2 = task::spawn(queue.put(second.wait()));
    assert_pending!(p2.poll());

    let mut get = task::spawn(queue.get());
    assert_ready_eq!(get.poll(), Ok(1));
    assert!(p2.is_woken());
    assert_ready_eq!(p2.poll(), 1);
    assert_eq!(queue.fulfilled(), 1);

    let mut get = task::spawn(queue.get());
    assert_ready_eq!(get.poll(), Ok(2));
    assert_eq!(queue.fulfilled(), 0);
}

thread_local! {
    static NOW: Cell<Ticks> = const { Cell::new(0) };
}

#[test]
fn rate_limiter_burst_then_block() {
    let clock = Clock::new(|| NOW.with(Cell::get)).named("e2e-clock");
    let timer = Timer::new(clock.clone());
    let limiter = RateLimiter::new("e2e", Limit::new(2, 1_000_000), clock, timer.clone());

    let mut w1 = task::spawn(limiter.wait());
    let mut w2 = task::spawn(limiter.wait());
    let mut w3 = task::spawn(limiter.wait());

    assert_ready!(w1.poll());
    assert_ready!(w2.poll());
    assert_pending!(w3.poll());

    for _ in 0..5 {
        NOW.with(|now| now.set(now.get() + POLL_INTERVAL));
        timer.turn();
        assert_pending!(w3.poll());
    }
}
