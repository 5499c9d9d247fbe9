use super::*;
use crate::util::test::trace_init;
use proptest::{collection::vec, prelude::*};
use tokio_test::{assert_pending, assert_ready, assert_ready_eq, task};

#[test]
fn fifo_yields_in_insertion_order() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);
    queue.put_nowait(1).unwrap();
    queue.put_nowait(2).unwrap();
    queue.put_nowait(3).unwrap();

    assert_eq!(queue.get_nowait(), Ok(1));
    assert_eq!(queue.get_nowait(), Ok(2));
    assert_eq!(queue.get_nowait(), Ok(3));
    assert!(queue.get_nowait().is_err());
}

#[test]
fn lifo_yields_in_stack_order() {
    let _trace = trace_init();
    let queue = Queue::lifo(0);
    queue.put_nowait(1).unwrap();
    queue.put_nowait(2).unwrap();
    queue.put_nowait(3).unwrap();

    assert_eq!(queue.get_nowait(), Ok(3));
    assert_eq!(queue.get_nowait(), Ok(2));
    assert_eq!(queue.get_nowait(), Ok(1));
}

#[test]
fn priority_yields_lowest_key_first() {
    let _trace = trace_init();
    let queue = PriorityQueue::new(0);
    queue.put_nowait("last", 20).unwrap();
    queue.put_nowait("first", 10).unwrap();
    queue.put_nowait("middle", 15).unwrap();

    assert_eq!(queue.get_nowait(), Ok("first"));
    assert_eq!(queue.get_nowait(), Ok("middle"));
    assert_eq!(queue.get_nowait(), Ok("last"));
}

#[test]
fn priority_ties_preserve_insertion_order() {
    let _trace = trace_init();
    let queue = PriorityQueue::new(0);
    queue.put_nowait("a", 5).unwrap();
    queue.put_nowait("b", 5).unwrap();
    queue.put_nowait("c", 1).unwrap();
    queue.put_nowait("d", 5).unwrap();

    assert_eq!(queue.get_nowait(), Ok("c"));
    assert_eq!(queue.get_nowait(), Ok("a"));
    assert_eq!(queue.get_nowait(), Ok("b"));
    assert_eq!(queue.get_nowait(), Ok("d"));
}

#[test]
fn put_nowait_on_a_full_queue_hands_the_item_back() {
    let _trace = trace_init();
    let queue = Queue::fifo(1);
    queue.put_nowait(1).unwrap();

    let err = queue.put_nowait(2).unwrap_err();
    assert_eq!(err.into_inner(), 2);
    assert!(queue.is_full());
}

#[test]
fn put_suspends_only_while_full() {
    let _trace = trace_init();
    let queue = Queue::fifo(2);
    queue.put_nowait(1).unwrap();
    queue.put_nowait(2).unwrap();

    let mut put = task::spawn(queue.put(3));
    assert_pending!(put.poll());

    // Extraction frees a slot and wakes the producer.
    assert_eq!(queue.get_nowait(), Ok(1));
    assert!(put.is_woken());
    assert_ready!(put.poll());
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.get_nowait(), Ok(2));
    assert_eq!(queue.get_nowait(), Ok(3));
}

#[test]
fn get_suspends_only_while_empty() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);

    let mut get = task::spawn(queue.get());
    assert_pending!(get.poll());

    queue.put_nowait(7).unwrap();
    assert!(get.is_woken());
    assert_ready_eq!(get.poll(), 7);
}

#[test]
fn getters_are_woken_in_fifo_order() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);

    let mut g1 = task::spawn(queue.get());
    let mut g2 = task::spawn(queue.get());
    assert_pending!(g1.poll());
    assert_pending!(g2.poll());

    queue.put_nowait(1).unwrap();
    assert!(g1.is_woken());
    assert!(!g2.is_woken());
    assert_ready_eq!(g1.poll(), 1);

    queue.put_nowait(2).unwrap();
    assert!(g2.is_woken());
    assert_ready_eq!(g2.poll(), 2);
}

#[test]
fn dropped_getter_forwards_its_wakeup() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);

    let mut g1 = task::spawn(queue.get());
    let mut g2 = task::spawn(queue.get());
    assert_pending!(g1.poll());
    assert_pending!(g2.poll());

    // g1 is woken for the item but dropped before claiming it; the wakeup
    // must reach g2 and the item must stay in the buffer until claimed.
    queue.put_nowait(9).unwrap();
    assert!(g1.is_woken());
    drop(g1);

    assert!(g2.is_woken());
    assert_ready_eq!(g2.poll(), 9);
}

#[test]
fn dropped_putter_forwards_its_wakeup() {
    let _trace = trace_init();
    let queue = Queue::fifo(1);
    queue.put_nowait(0).unwrap();

    let mut p1 = task::spawn(queue.put(1));
    let mut p2 = task::spawn(queue.put(2));
    assert_pending!(p1.poll());
    assert_pending!(p2.poll());

    assert_eq!(queue.get_nowait(), Ok(0));
    assert!(p1.is_woken());
    drop(p1);

    assert!(p2.is_woken());
    assert_ready!(p2.poll());
    assert_eq!(queue.get_nowait(), Ok(2));
}

#[test]
fn woken_getter_rearms_if_a_peer_drained_first() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);

    let mut get = task::spawn(queue.get());
    assert_pending!(get.poll());

    queue.put_nowait(1).unwrap();
    assert!(get.is_woken());

    // A non-waiting consumer races in before the woken getter runs.
    assert_eq!(queue.get_nowait(), Ok(1));
    assert_pending!(get.poll());

    queue.put_nowait(2).unwrap();
    assert!(get.is_woken());
    assert_ready_eq!(get.poll(), 2);
}

#[test]
fn wait_len_resolves_at_the_threshold_without_consuming() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);

    let mut wait = task::spawn(queue.wait_len(2));
    assert_pending!(wait.poll());

    queue.put_nowait(1).unwrap();
    assert!(wait.is_woken());
    assert_pending!(wait.poll());

    queue.put_nowait(2).unwrap();
    assert!(wait.is_woken());
    assert_ready!(wait.poll());

    // Nothing was consumed.
    assert_eq!(queue.len(), 2);
}

#[test]
fn wait_len_forwards_the_wake_it_cannot_use() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);

    // The threshold-2 waiter parks first, so the first insertion's wakeup
    // lands on it; a threshold-1 peer behind it must still be served.
    let mut big = task::spawn(queue.wait_len(2));
    let mut small = task::spawn(queue.wait_len(1));
    assert_pending!(big.poll());
    assert_pending!(small.poll());

    queue.put_nowait(1).unwrap();
    assert!(big.is_woken());
    assert_pending!(big.poll());
    assert!(small.is_woken());
    assert_ready!(small.poll());

    queue.put_nowait(2).unwrap();
    assert!(big.is_woken());
    assert_ready!(big.poll());
}

#[test]
fn get_all_drains_the_whole_buffer() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);
    queue.put_nowait(1).unwrap();
    queue.put_nowait(2).unwrap();
    queue.put_nowait(3).unwrap();

    let mut get_all = task::spawn(queue.get_all());
    assert_ready_eq!(get_all.poll(), vec![1, 2, 3]);
    assert!(queue.is_empty());
}

#[test]
fn get_all_waits_for_the_first_item() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);

    let mut get_all = task::spawn(queue.get_all());
    assert_pending!(get_all.poll());

    queue.put_nowait(4).unwrap();
    assert!(get_all.is_woken());
    assert_ready_eq!(get_all.poll(), vec![4]);
}

#[test]
fn get_all_wakes_one_putter_per_freed_slot() {
    let _trace = trace_init();
    let queue = Queue::fifo(2);
    queue.put_nowait(1).unwrap();
    queue.put_nowait(2).unwrap();

    let mut p1 = task::spawn(queue.put(3));
    let mut p2 = task::spawn(queue.put(4));
    assert_pending!(p1.poll());
    assert_pending!(p2.poll());

    let mut get_all = task::spawn(queue.get_all());
    assert_ready_eq!(get_all.poll(), vec![1, 2]);

    assert!(p1.is_woken());
    assert!(p2.is_woken());
    assert_ready!(p1.poll());
    assert_ready!(p2.poll());
    assert_eq!(queue.len(), 2);
}

#[test]
fn join_resolves_once_every_item_is_done() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);

    // A fresh queue has nothing outstanding.
    let mut idle_join = task::spawn(queue.join());
    assert_ready!(idle_join.poll());

    queue.put_nowait(1).unwrap();
    queue.put_nowait(2).unwrap();
    assert_eq!(queue.unfinished_tasks(), 2);

    let mut join = task::spawn(queue.join());
    assert_pending!(join.poll());

    assert_eq!(queue.get_nowait(), Ok(1));
    queue.task_done().unwrap();
    assert_pending!(join.poll());

    assert_eq!(queue.get_nowait(), Ok(2));
    queue.task_done().unwrap();
    assert!(join.is_woken());
    assert_ready!(join.poll());

    // The ledger is balanced; another task_done would go negative.
    assert!(queue.task_done().is_err());
}

#[test]
fn task_done_n_accounts_in_bulk() {
    let _trace = trace_init();
    let queue = Queue::fifo(0);
    for i in 0..3 {
        queue.put_nowait(i).unwrap();
    }

    let mut join = task::spawn(queue.join());
    assert_pending!(join.poll());

    assert!(queue.task_done_n(4).is_err());
    queue.task_done_n(3).unwrap();
    assert!(join.is_woken());
    assert_ready!(join.poll());
}

proptest! {
    #[test]
    fn priority_emission_is_sorted_and_stable(keys in vec(0u64..10, 1..64)) {
        let queue = PriorityQueue::new(0);
        for (idx, key) in keys.iter().enumerate() {
            queue.put_nowait(idx, *key).unwrap();
        }

        let mut last: Option<(u64, usize)> = None;
        while let Ok(idx) = queue.get_nowait() {
            let key = keys[idx];
            if let Some((prev_key, prev_idx)) = last {
                prop_assert!(key >= prev_key, "keys must be non-decreasing");
                if key == prev_key {
                    prop_assert!(idx > prev_idx, "ties must keep insertion order");
                }
            }
            last = Some((key, idx));
        }
        prop_assert!(queue.is_empty());
    }
}
