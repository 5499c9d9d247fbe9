use super::*;
use crate::util::test::trace_init;
use tokio_test::{assert_pending, assert_ready, task};

#[test]
fn acquires_up_to_the_permit_count() {
    let _trace = trace_init();
    let semaphore = Semaphore::new(2);
    assert_eq!(semaphore.available_permits(), 2);

    assert_ready!(task::spawn(semaphore.acquire()).poll());
    assert_ready!(task::spawn(semaphore.acquire()).poll());
    assert_eq!(semaphore.available_permits(), 0);
    assert!(semaphore.is_exhausted());

    // The permits are spent; the next acquire must wait.
    let mut blocked = task::spawn(semaphore.acquire());
    assert_pending!(blocked.poll());

    semaphore.release();
    assert!(blocked.is_woken());
    assert_ready!(blocked.poll());
    assert_eq!(semaphore.available_permits(), 0);
}

#[test]
fn waiters_are_granted_in_fifo_order() {
    let _trace = trace_init();
    let semaphore = Semaphore::new(0);

    let mut a1 = task::spawn(semaphore.acquire());
    let mut a2 = task::spawn(semaphore.acquire());
    assert_pending!(a1.poll());
    assert_pending!(a2.poll());

    semaphore.release();
    assert!(a1.is_woken());
    assert!(!a2.is_woken());
    assert_ready!(a1.poll());

    semaphore.release();
    assert!(a2.is_woken());
    assert_ready!(a2.poll());
}

#[test]
fn add_permits_wakes_as_many_waiters_as_it_can() {
    let _trace = trace_init();
    let semaphore = Semaphore::new(0);

    let mut a1 = task::spawn(semaphore.acquire());
    let mut a2 = task::spawn(semaphore.acquire());
    let mut a3 = task::spawn(semaphore.acquire());
    assert_pending!(a1.poll());
    assert_pending!(a2.poll());
    assert_pending!(a3.poll());

    semaphore.add_permits(2);
    assert!(a1.is_woken());
    assert!(a2.is_woken());
    assert!(!a3.is_woken());
    assert_ready!(a1.poll());
    assert_ready!(a2.poll());
    assert_pending!(a3.poll());
    assert_eq!(semaphore.available_permits(), 0);
}

#[test]
fn permits_left_over_after_waking_stay_available() {
    let _trace = trace_init();
    let semaphore = Semaphore::new(0);

    let mut a1 = task::spawn(semaphore.acquire());
    assert_pending!(a1.poll());

    semaphore.add_permits(3);
    assert!(a1.is_woken());
    assert_ready!(a1.poll());
    assert_eq!(semaphore.available_permits(), 2);
}

#[test]
fn dropped_waiter_returns_its_permit() {
    let _trace = trace_init();
    let semaphore = Semaphore::new(0);

    let mut a1 = task::spawn(semaphore.acquire());
    let mut a2 = task::spawn(semaphore.acquire());
    assert_pending!(a1.poll());
    assert_pending!(a2.poll());

    // The released permit is consumed on a1's behalf; dropping a1 without
    // polling must hand it to a2 instead of losing it.
    semaphore.release();
    assert!(a1.is_woken());
    drop(a1);

    assert!(a2.is_woken());
    assert_ready!(a2.poll());
    assert_eq!(semaphore.available_permits(), 0);
}

#[test]
fn dropped_pending_waiter_consumes_nothing() {
    let _trace = trace_init();
    let semaphore = Semaphore::new(0);

    let mut a1 = task::spawn(semaphore.acquire());
    assert_pending!(a1.poll());
    drop(a1);

    semaphore.release();
    assert_eq!(semaphore.available_permits(), 1);
}
