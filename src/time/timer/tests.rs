use super::*;
use crate::util::test::trace_init;
use std::cell::Cell;
use tokio_test::{assert_pending, assert_ready, task};

thread_local! {
    static NOW: Cell<Ticks> = const { Cell::new(0) };
}

fn test_timer() -> Timer {
    Timer::new(Clock::new(|| NOW.with(Cell::get)).named("test-clock"))
}

fn advance(ms: Ticks) {
    NOW.with(|now| now.set(now.get() + ms));
}

#[test]
fn a_sleep_fires_once_its_deadline_passes() {
    let _trace = trace_init();
    let timer = test_timer();

    let mut sleep = task::spawn(timer.sleep(100));
    assert_pending!(sleep.poll());

    // Turning the timer without advancing the clock fires nothing.
    assert_eq!(timer.turn(), 0);
    assert_pending!(sleep.poll());

    advance(99);
    assert_eq!(timer.turn(), 0);

    advance(1);
    assert_eq!(timer.turn(), 1);
    assert!(sleep.is_woken());
    assert_ready!(sleep.poll());
}

#[test]
fn sleeps_fire_in_deadline_order() {
    let _trace = trace_init();
    let timer = test_timer();

    let mut long = task::spawn(timer.sleep(200));
    let mut short = task::spawn(timer.sleep(50));
    assert_pending!(long.poll());
    assert_pending!(short.poll());

    advance(50);
    assert_eq!(timer.turn(), 1);
    assert!(short.is_woken());
    assert!(!long.is_woken());
    assert_ready!(short.poll());
    assert_pending!(long.poll());

    advance(150);
    assert_eq!(timer.turn(), 1);
    assert!(long.is_woken());
    assert_ready!(long.poll());
}

#[test]
fn one_turn_fires_every_due_sleep() {
    let _trace = trace_init();
    let timer = test_timer();

    let mut sleeps: Vec<_> = (1..=3).map(|i| task::spawn(timer.sleep(i * 10))).collect();
    for sleep in &mut sleeps {
        assert_pending!(sleep.poll());
    }

    advance(30);
    assert_eq!(timer.turn(), 3);
    for sleep in &mut sleeps {
        assert!(sleep.is_woken());
        assert_ready!(sleep.poll());
    }
}

#[test]
fn a_dropped_sleep_is_forgotten() {
    let _trace = trace_init();
    let timer = test_timer();

    let sleep = timer.sleep(10);
    drop(sleep);

    advance(10);
    assert_eq!(timer.turn(), 0);
}

#[test]
fn a_zero_length_sleep_still_waits_for_a_turn() {
    let _trace = trace_init();
    let timer = test_timer();

    let mut sleep = task::spawn(timer.sleep(0));
    assert_pending!(sleep.poll());

    assert_eq!(timer.turn(), 1);
    assert!(sleep.is_woken());
    assert_ready!(sleep.poll());
}
