//! Deduplicated bounded-parallelism work queue.
//!
//! A [`WorkQueue`] holds a set of items to process. Items are deduplicated
//! by value equality, so adding the same item twice runs it once. The
//! handler passed to [`WorkQueue::run`] may itself call [`WorkQueue::add`],
//! and newly scheduled items become visible to idle workers; `run` returns
//! only when no item is pending and no worker is still executing the
//! handler.
//!
//! Workers exist purely to overlap latency (handlers may block on I/O);
//! nothing about the result of a run may depend on which worker processed
//! which item, or in what order.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Condvar, Mutex};

pub struct WorkQueue<T> {
    state: Mutex<State<T>>,
    idle: Condvar,
}

struct State<T> {
    /// Every item ever added, for deduplication.
    seen: HashSet<T>,
    /// Items scheduled but not yet picked up by a worker.
    todo: VecDeque<T>,
    /// Number of workers started by `run`.
    workers: usize,
    /// Number of workers currently blocked waiting for an item.
    waiting: usize,
    started: bool,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                seen: HashSet::new(),
                todo: VecDeque::new(),
                workers: 0,
                waiting: 0,
                started: false,
            }),
            idle: Condvar::new(),
        }
    }
}

impl<T: Clone + Eq + Hash + Send> WorkQueue<T> {
    /// Schedule `item` unless an equal item was already added.
    pub fn add(&self, item: T) {
        let mut state = self.state.lock().unwrap();
        if state.seen.insert(item.clone()) {
            state.todo.push_back(item);
            if state.waiting > 0 {
                self.idle.notify_one();
            }
        }
    }

    /// Run `f` on every scheduled item, with up to `parallelism` invocations
    /// in flight at a time. Returns once every item (including items added
    /// from within `f`) has been processed.
    ///
    /// May be called at most once per queue.
    pub fn run<F>(&self, parallelism: usize, f: F)
    where
        F: Fn(T) + Sync,
    {
        assert!(parallelism >= 1, "work queue needs at least one worker");
        {
            let mut state = self.state.lock().unwrap();
            assert!(!state.started, "WorkQueue::run may only be called once");
            state.started = true;
            state.workers = parallelism;
        }
        std::thread::scope(|scope| {
            for _ in 0..parallelism - 1 {
                scope.spawn(|| self.runner(&f));
            }
            self.runner(&f);
        });
    }

    /// Worker loop: take items until the queue is empty and every worker is
    /// waiting. The last worker to go idle wakes the others so all of them
    /// observe the drained state and return.
    fn runner<F: Fn(T)>(&self, f: &F) {
        let mut state = self.state.lock().unwrap();
        loop {
            while state.todo.is_empty() {
                state.waiting += 1;
                if state.waiting == state.workers {
                    self.idle.notify_all();
                    return;
                }
                state = self.idle.wait(state).unwrap();
                state.waiting -= 1;
            }
            let item = state.todo.pop_front().unwrap();
            drop(state);
            f(item);
            state = self.state.lock().unwrap();
        }
    }
}
