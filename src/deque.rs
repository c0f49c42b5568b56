//! Per-worker double-ended task deque
//!
//! The owning worker pushes and pops at the front. The work-sharing balancer
//! moves surplus between deques at the back, leaving the owner's imminent
//! work alone. All access goes through [`DequeGuard`], so the items are
//! unreachable without holding the lock.

use std::collections::VecDeque;

use parking_lot::{Mutex, MutexGuard};

use crate::processor::Query;

/// Deque of pending queries owned by one request worker
pub type QueryDeque = WorkerDeque<Query>;

#[derive(Debug)]
struct DequeState<T> {
    items: VecDeque<T>,
    // Owner has exited; deposits would be stranded
    retired: bool,
}

#[derive(Debug)]
pub struct WorkerDeque<T> {
    state: Mutex<DequeState<T>>,
}

impl<T> Default for WorkerDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkerDeque<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DequeState {
                items: VecDeque::new(),
                retired: false,
            }),
        }
    }

    pub fn lock(&self) -> DequeGuard<'_, T> {
        DequeGuard {
            state: self.state.lock(),
        }
    }

    /// Lock, read the length, unlock
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Owner-side fill: the first item of `batch` ends up at the front
    pub fn load_front(&self, batch: Vec<T>) {
        let mut guard = self.lock();
        for item in batch.into_iter().rev() {
            guard.push_front(item);
        }
    }

    /// Owner-side take
    pub fn pop_front(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Mark the deque as abandoned if it is still empty.
    /// Returns false when work arrived in the meantime.
    pub fn retire_if_empty(&self) -> bool {
        let mut guard = self.lock();
        if guard.is_empty() {
            guard.state.retired = true;
            true
        } else {
            false
        }
    }
}

/// Exclusive access to a [`WorkerDeque`]; unlocks on drop
pub struct DequeGuard<'a, T> {
    state: MutexGuard<'a, DequeState<T>>,
}

impl<T> DequeGuard<'_, T> {
    pub fn push_front(&mut self, item: T) {
        self.state.items.push_front(item);
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.state.items.pop_front()
    }

    pub fn push_back(&mut self, item: T) {
        self.state.items.push_back(item);
    }

    pub fn pop_back(&mut self) -> Option<T> {
        self.state.items.pop_back()
    }

    pub fn len(&self) -> usize {
        self.state.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.items.is_empty()
    }

    pub fn is_retired(&self) -> bool {
        self.state.retired
    }
}
