//! Coarse-grained shared FIFO
//!
//! One mutex guards the whole queue. Single operations lock internally;
//! callers that need a check-then-dequeue sequence take the guard with
//! [`SharedQueue::lock`] or use [`SharedQueue::take_batch`], which clamps
//! and withdraws under one acquisition so two workers never compute
//! overlapping batch windows.

use std::collections::VecDeque;

use parking_lot::{Mutex, MutexGuard};

use crate::graph::CityId;
use crate::processor::Query;

/// Incoming route queries awaiting a request worker
pub type RequestQueue = SharedQueue<Query>;

/// Source cities awaiting a path-computation worker
pub type CityQueue = SharedQueue<CityId>;

#[derive(Debug)]
pub struct SharedQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for SharedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for SharedQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

impl<T> SharedQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Hold the queue lock across several operations
    pub fn lock(&self) -> QueueGuard<'_, T> {
        QueueGuard {
            items: self.items.lock(),
        }
    }

    pub fn enqueue(&self, item: T) {
        self.lock().enqueue(item);
    }

    /// Front item, or `None` when empty
    pub fn dequeue(&self) -> Option<T> {
        self.lock().dequeue()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Withdraw up to `max` items in FIFO order under a single lock.
    /// An empty vector means the queue is drained.
    pub fn take_batch(&self, max: usize) -> Vec<T> {
        let mut guard = self.lock();
        let take = max.min(guard.len());
        let mut batch = Vec::with_capacity(take);
        for _ in 0..take {
            if let Some(item) = guard.dequeue() {
                batch.push(item);
            }
        }
        batch
    }
}

/// Exclusive access to a [`SharedQueue`]; unlocks on drop
pub struct QueueGuard<'a, T> {
    items: MutexGuard<'a, VecDeque<T>>,
}

impl<T> QueueGuard<'_, T> {
    pub fn enqueue(&mut self, item: T) {
        self.items.push_back(item);
    }

    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Batch size used by both pools: the work divided evenly, rounded up.
/// Always at least one so a worker never spins on empty batches.
pub fn batch_size(total: usize, workers: usize) -> usize {
    total.div_ceil(workers.max(1)).max(1)
}
