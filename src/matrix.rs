//! Write-once result matrix
//!
//! Every ordered (source, destination) pair owns a [`FutureCell`]. The
//! path-computation worker that owns a source publishes its whole row; query
//! workers block on individual cells until that row lands. Cells are never
//! reset, so a reader arriving after publication returns immediately.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::dijkstra::PathRecord;
use crate::error::{Error, Result};
use crate::graph::CityId;

/// Single-assignment, multi-reader synchronization cell
#[derive(Debug)]
pub struct FutureCell<T> {
    value: OnceLock<T>,
    // Serializes publish against the waiters' check-then-sleep
    lock: Mutex<()>,
    ready: Condvar,
}

impl<T> Default for FutureCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FutureCell<T> {
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            lock: Mutex::new(()),
            ready: Condvar::new(),
        }
    }

    /// Store the value and wake every waiter.
    ///
    /// A second publication is rejected and hands the value back; the
    /// first value stays visible to all readers.
    pub fn publish(&self, value: T) -> std::result::Result<(), T> {
        let _guard = self.lock.lock();
        self.value.set(value)?;
        self.ready.notify_all();
        Ok(())
    }

    /// Block until published, then borrow the value
    pub fn wait(&self) -> &T {
        if let Some(value) = self.value.get() {
            return value;
        }
        let mut guard = self.lock.lock();
        loop {
            if let Some(value) = self.value.get() {
                return value;
            }
            self.ready.wait(&mut guard);
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<&T> {
        if let Some(value) = self.value.get() {
            return Some(value);
        }
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        loop {
            if let Some(value) = self.value.get() {
                return Some(value);
            }
            if self.ready.wait_until(&mut guard, deadline).timed_out() {
                return self.value.get();
            }
        }
    }

    /// Non-blocking read
    pub fn try_get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_published(&self) -> bool {
        self.value.get().is_some()
    }
}

/// N×N grid of [`FutureCell`]s, stored row-major
#[derive(Debug)]
pub struct ResultMatrix {
    n: usize,
    cells: Vec<FutureCell<PathRecord>>,
    published: AtomicUsize,
}

impl ResultMatrix {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            cells: (0..n * n).map(|_| FutureCell::new()).collect(),
            published: AtomicUsize::new(0),
        }
    }

    pub fn cell(&self, row: CityId, col: CityId) -> &FutureCell<PathRecord> {
        &self.cells[row * self.n + col]
    }

    /// Publish a single cell, rejecting a second write
    pub fn publish(&self, row: CityId, col: CityId, record: PathRecord) -> Result<()> {
        match self.cell(row, col).publish(record) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) => {
                log::warn!("Rejected second publication into cell ({row}, {col})");
                Err(Error::AlreadyPublished { row, col })
            }
        }
    }

    /// Publish a full row as produced by one single-source search.
    /// `records[col]` must be the record for destination id `col`.
    ///
    /// A rejected cell keeps its first value and does not stop the rest of
    /// the row; the first rejection is returned once every cell was tried.
    pub fn publish_row(&self, row: CityId, records: Vec<PathRecord>) -> Result<()> {
        let mut first_err = None;
        for (col, record) in records.into_iter().enumerate() {
            if let Err(err) = self.publish(row, col, record) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Block until the cell is published
    pub fn wait(&self, row: CityId, col: CityId) -> &PathRecord {
        self.cell(row, col).wait()
    }

    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }

    pub fn is_complete(&self) -> bool {
        self.published_count() == self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn record(price: u64) -> PathRecord {
        PathRecord {
            source: "A".to_string(),
            destination: "B".to_string(),
            price,
            path: vec!["A".to_string(), "B".to_string()],
        }
    }

    #[test]
    fn test_wait_after_publish_returns_immediately() {
        let cell = FutureCell::new();
        cell.publish(42u32).unwrap();
        assert_eq!(*cell.wait(), 42);
        assert_eq!(*cell.wait(), 42);
        assert_eq!(cell.try_get(), Some(&42));
    }

    #[test]
    fn test_waiters_before_publish_all_see_value() {
        let cell = Arc::new(FutureCell::new());
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || *cell.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        cell.publish(7u64).unwrap();

        for w in waiters {
            assert_eq!(w.join().unwrap(), 7);
        }
        // Late reader sees the same value
        assert_eq!(*cell.wait(), 7);
    }

    #[test]
    fn test_second_publish_rejected_first_value_kept() {
        let cell = FutureCell::new();
        cell.publish("first").unwrap();
        assert_eq!(cell.publish("second"), Err("second"));
        assert_eq!(*cell.wait(), "first");
    }

    #[test]
    fn test_wait_timeout() {
        let cell: FutureCell<u8> = FutureCell::new();
        assert_eq!(cell.wait_timeout(Duration::from_millis(10)), None);
        assert!(!cell.is_published());

        cell.publish(3).unwrap();
        assert_eq!(cell.wait_timeout(Duration::from_millis(10)), Some(&3));
    }

    #[test]
    fn test_matrix_rejects_double_publish() {
        let matrix = ResultMatrix::new(2);
        matrix.publish(0, 1, record(5)).unwrap();
        match matrix.publish(0, 1, record(9)) {
            Err(Error::AlreadyPublished { row: 0, col: 1 }) => {}
            other => panic!("Expected AlreadyPublished, got {:?}", other),
        }
        assert_eq!(matrix.wait(0, 1).price, 5);
        assert_eq!(matrix.published_count(), 1);
    }

    #[test]
    fn test_publish_row_fills_remaining_cells_after_rejection() {
        let matrix = ResultMatrix::new(3);
        matrix.publish(1, 0, record(1)).unwrap();

        let row = (0..3).map(|i| record(i as u64 * 10)).collect();
        match matrix.publish_row(1, row) {
            Err(Error::AlreadyPublished { row: 1, col: 0 }) => {}
            other => panic!("Expected AlreadyPublished, got {:?}", other),
        }
        assert_eq!(matrix.wait(1, 0).price, 1);
        assert_eq!(matrix.wait(1, 1).price, 10);
        assert_eq!(matrix.wait(1, 2).price, 20);
        assert_eq!(matrix.published_count(), 3);
    }

    #[test]
    fn test_matrix_cross_thread_row_publication() {
        let matrix = Arc::new(ResultMatrix::new(3));
        let reader = {
            let matrix = Arc::clone(&matrix);
            thread::spawn(move || matrix.wait(2, 1).price)
        };

        thread::sleep(Duration::from_millis(10));
        let row = (0..3).map(|i| record(i as u64 * 10)).collect();
        matrix.publish_row(2, row).unwrap();

        assert_eq!(reader.join().unwrap(), 10);
        assert_eq!(matrix.published_count(), 3);
        assert!(!matrix.is_complete());
    }
}
