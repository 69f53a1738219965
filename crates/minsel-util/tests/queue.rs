use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use minsel_util::queue::WorkQueue;

#[test]
fn test_duplicate_items_run_once() {
    let queue = WorkQueue::new();
    queue.add(7u32);
    queue.add(7u32);
    queue.add(7u32);

    let count = AtomicUsize::new(0);
    queue.run(4, |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_single_worker_drains_everything() {
    let queue = WorkQueue::new();
    for i in 0..50u32 {
        queue.add(i);
    }
    let count = AtomicUsize::new(0);
    queue.run(1, |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(count.load(Ordering::SeqCst), 50);
}

#[test]
fn test_recursive_add_is_visible_to_workers() {
    const LIMIT: u32 = 500;

    let queue = WorkQueue::new();
    queue.add(0u32);

    let done = Mutex::new(HashSet::new());
    queue.run(8, |item| {
        // Binary fan-out: every item schedules two children.
        for child in [item * 2 + 1, item * 2 + 2] {
            if child < LIMIT {
                queue.add(child);
            }
        }
        assert!(done.lock().unwrap().insert(item), "item {item} ran twice");
    });

    let done = done.into_inner().unwrap();
    assert_eq!(done.len(), LIMIT as usize);
    assert!((0..LIMIT).all(|i| done.contains(&i)));
}

#[test]
fn test_sequential_chain_keeps_idle_workers_alive() {
    // Only one item is runnable at a time, so most workers sit idle while
    // the chain trickles in. Exercises the wake-on-add path and the
    // completion check at the tail of a drain.
    const CHAIN: u64 = 200;

    let queue = WorkQueue::new();
    queue.add(0u64);

    let count = AtomicUsize::new(0);
    queue.run(8, |item| {
        count.fetch_add(1, Ordering::SeqCst);
        if item + 1 < CHAIN {
            queue.add(item + 1);
        }
    });
    assert_eq!(count.load(Ordering::SeqCst), CHAIN as usize);
}

#[test]
fn test_drain_tail_stress() {
    // Repeatedly race "last worker about to go idle" against "another
    // worker just enqueued new items". A broken completion condition
    // either deadlocks or exits early with unprocessed items.
    for round in 0..30 {
        let queue = WorkQueue::new();
        queue.add((round, 0u32));

        let done = Mutex::new(HashSet::new());
        queue.run(16, |(round, item)| {
            if item % 3 == 0 {
                std::thread::sleep(Duration::from_micros(50));
            }
            for child in [item * 2 + 1, item * 2 + 2] {
                if child < 300 {
                    queue.add((round, child));
                }
            }
            assert!(done.lock().unwrap().insert(item));
        });

        assert_eq!(done.into_inner().unwrap().len(), 300);
    }
}

#[test]
#[should_panic(expected = "at least one worker")]
fn test_zero_parallelism_panics() {
    let queue: WorkQueue<u32> = WorkQueue::new();
    queue.run(0, |_| {});
}
