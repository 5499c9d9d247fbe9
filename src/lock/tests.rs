use super::*;
use crate::util::test::trace_init;
use tokio_test::{assert_pending, assert_ready, task};

#[test]
fn uncontended_acquire_resolves_immediately() {
    let _trace = trace_init();
    let lock = Lock::new();
    assert!(!lock.is_locked());

    let mut acquire = task::spawn(lock.acquire());
    assert_ready!(acquire.poll());
    assert!(lock.is_locked());

    lock.release().unwrap();
    assert!(!lock.is_locked());
}

#[test]
fn release_of_an_unheld_lock_fails() {
    let _trace = trace_init();
    let lock = Lock::new();
    assert!(lock.release().is_err());
}

#[test]
fn baton_passing() {
    let _trace = trace_init();
    let lock = Lock::new();
    assert_ready!(task::spawn(lock.acquire()).poll());

    let mut a1 = task::spawn(lock.acquire());
    let mut a2 = task::spawn(lock.acquire());
    assert_pending!(a1.poll());
    assert_pending!(a2.poll());

    // Each release hands the lock to exactly one waiter, and the lock is
    // never observably unlocked in between.
    lock.release().unwrap();
    assert!(a1.is_woken());
    assert!(!a2.is_woken());
    assert!(lock.is_locked());
    assert_ready!(a1.poll());

    lock.release().unwrap();
    assert!(a2.is_woken());
    assert!(lock.is_locked());
    assert_ready!(a2.poll());

    lock.release().unwrap();
    assert!(!lock.is_locked());
}

#[test]
fn dropped_waiter_is_skipped() {
    let _trace = trace_init();
    let lock = Lock::new();
    assert_ready!(task::spawn(lock.acquire()).poll());

    let mut a1 = task::spawn(lock.acquire());
    let mut a2 = task::spawn(lock.acquire());
    assert_pending!(a1.poll());
    assert_pending!(a2.poll());

    drop(a1);
    lock.release().unwrap();
    assert!(a2.is_woken());
    assert!(lock.is_locked());
    assert_ready!(a2.poll());
}

#[test]
fn dropped_winner_passes_the_lock_on() {
    let _trace = trace_init();
    let lock = Lock::new();
    assert_ready!(task::spawn(lock.acquire()).poll());

    let mut a1 = task::spawn(lock.acquire());
    let mut a2 = task::spawn(lock.acquire());
    assert_pending!(a1.poll());
    assert_pending!(a2.poll());

    // a1 is granted the lock but never observes it; dropping it must not
    // leave the lock stranded.
    lock.release().unwrap();
    assert!(a1.is_woken());
    drop(a1);

    assert!(a2.is_woken());
    assert!(lock.is_locked());
    assert_ready!(a2.poll());
}

#[test]
fn dropping_every_waiter_unlocks_on_release() {
    let _trace = trace_init();
    let lock = Lock::new();
    assert_ready!(task::spawn(lock.acquire()).poll());

    let mut a1 = task::spawn(lock.acquire());
    assert_pending!(a1.poll());
    drop(a1);

    lock.release().unwrap();
    assert!(!lock.is_locked());
}
