//! Worker pools
//!
//! Path-computation workers drain a shared [`CityQueue`] in batches and
//! publish one matrix row per source city. Request workers pull batches of
//! queries into their own [`QueryDeque`], resolve them front to back, and
//! rebalance with a random peer after each query.

use std::thread::{self, Scope, ScopedJoinHandle};

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::balancer::{BalanceOutcome, WorkSharingBalancer};
use crate::deque::QueryDeque;
use crate::dijkstra::ShortestPathEngine;
use crate::error::{Error, Result};
use crate::graph::FlightGraph;
use crate::io::OutcomeSink;
use crate::matrix::ResultMatrix;
use crate::processor::{Query, QueryOutcome, QueryProcessor};
use crate::queue::{batch_size, CityQueue, RequestQueue};

/// Fill every row of `matrix` on the calling thread, in id order.
/// A rejected publication is reported only after every row was written.
pub fn compute_all_pairs_sequential(graph: &FlightGraph, matrix: &ResultMatrix) -> Result<()> {
    let engine = ShortestPathEngine::new(graph);
    let mut first_err = None;
    for source in 0..graph.n_cities() {
        if let Err(err) = matrix.publish_row(source, engine.shortest_paths_from(source)) {
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Start a named worker thread inside `scope`
pub(crate) fn spawn_worker<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    name: String,
    f: F,
) -> Result<(String, ScopedJoinHandle<'scope, Result<T>>)>
where
    F: FnOnce() -> Result<T> + Send + 'scope,
    T: Send + 'scope,
{
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn_scoped(scope, f)
        .map_err(|source| Error::Spawn {
            name: name.clone(),
            source,
        })?;
    Ok((name, handle))
}

/// Join one worker, turning a panic into [`Error::WorkerPanicked`]
pub(crate) fn join_worker<T>((name, handle): (String, ScopedJoinHandle<'_, Result<T>>)) -> Result<T> {
    handle.join().map_err(|_| Error::WorkerPanicked(name))?
}

pub struct PathComputationPool<'a> {
    graph: &'a FlightGraph,
    matrix: &'a ResultMatrix,
    cities: CityQueue,
    batch: usize,
    workers: usize,
}

impl<'a> PathComputationPool<'a> {
    /// Queue every city id; the batch size is fixed here for the pool's lifetime
    pub fn new(graph: &'a FlightGraph, matrix: &'a ResultMatrix, workers: usize) -> Self {
        let n = graph.n_cities();
        Self {
            graph,
            matrix,
            cities: (0..n).collect(),
            batch: batch_size(n, workers),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Body of one worker. Returns the number of rows it published.
    ///
    /// Readers may be blocked on any row still queued, so the worker drains
    /// the queue before reporting the first rejected publication.
    pub fn work(&self, worker: usize) -> Result<usize> {
        let engine = ShortestPathEngine::new(self.graph);
        let mut rows = 0;
        let mut first_err = None;
        loop {
            let batch = self.cities.take_batch(self.batch);
            if batch.is_empty() {
                break;
            }
            for source in batch {
                if let Err(err) = self
                    .matrix
                    .publish_row(source, engine.shortest_paths_from(source))
                {
                    first_err.get_or_insert(err);
                }
                rows += 1;
            }
        }
        debug!("path-worker-{worker} finished after {rows} rows");
        first_err.map_or(Ok(rows), Err)
    }

    /// Spawn this pool's workers into an existing scope
    pub(crate) fn spawn<'scope>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
    ) -> Result<Vec<(String, ScopedJoinHandle<'scope, Result<usize>>)>> {
        (0..self.workers())
            .map(|i| spawn_worker(scope, format!("path-worker-{i}"), move || self.work(i)))
            .collect()
    }

    /// Run the pool to completion on its own threads
    pub fn run(&self) -> Result<()> {
        thread::scope(|s| -> Result<()> {
            for handle in self.spawn(s)? {
                join_worker(handle)?;
            }
            Ok(())
        })
    }
}

/// Counters one request worker accumulates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: usize,
    pub failures: usize,
    pub rebalance_attempts: usize,
    pub moved: usize,
}

impl WorkerStats {
    pub fn merge(&mut self, other: WorkerStats) {
        self.processed += other.processed;
        self.failures += other.failures;
        self.rebalance_attempts += other.rebalance_attempts;
        self.moved += other.moved;
    }

    fn record_balance(&mut self, outcome: BalanceOutcome) {
        match outcome {
            BalanceOutcome::NotTriggered | BalanceOutcome::SelfVictim => {}
            BalanceOutcome::WithinThreshold { .. } => self.rebalance_attempts += 1,
            BalanceOutcome::Moved { moved, .. } => {
                self.rebalance_attempts += 1;
                self.moved += moved;
            }
        }
    }
}

pub struct RequestPool<'a> {
    requests: RequestQueue,
    deques: Vec<QueryDeque>,
    processor: QueryProcessor<'a>,
    sink: &'a dyn OutcomeSink,
    threshold: usize,
    batch: usize,
    seed: Option<u64>,
}

impl<'a> RequestPool<'a> {
    pub fn new(
        queries: Vec<Query>,
        workers: usize,
        processor: QueryProcessor<'a>,
        sink: &'a dyn OutcomeSink,
        threshold: usize,
        seed: Option<u64>,
    ) -> Self {
        let batch = batch_size(queries.len(), workers);
        Self {
            requests: queries.into_iter().collect(),
            deques: (0..workers).map(|_| QueryDeque::new()).collect(),
            processor,
            sink,
            threshold,
            batch,
            seed,
        }
    }

    pub fn workers(&self) -> usize {
        self.deques.len()
    }

    fn rng_for(&self, worker: usize) -> StdRng {
        match self.seed {
            Some(base) => StdRng::seed_from_u64(base.wrapping_add(worker as u64)),
            None => StdRng::from_os_rng(),
        }
    }

    /// Body of request worker `me`.
    ///
    /// Own deque first; when it runs dry, pull the next batch from the
    /// shared queue. When both are empty the deque is retired under its
    /// lock, unless a peer deposited work in the meantime.
    pub fn work(&self, me: usize) -> Result<WorkerStats> {
        let own = &self.deques[me];
        let balancer = WorkSharingBalancer::new(&self.deques, self.threshold);
        let mut rng = self.rng_for(me);
        let mut stats = WorkerStats::default();

        loop {
            if let Some(query) = own.pop_front() {
                let outcome = self.processor.resolve(query);
                stats.processed += 1;
                if !outcome.is_ok() {
                    stats.failures += 1;
                }
                self.sink.emit(outcome)?;
                stats.record_balance(balancer.after_task(me, &mut rng));
                continue;
            }

            let batch = self.requests.take_batch(self.batch);
            if batch.is_empty() {
                if own.retire_if_empty() {
                    break;
                }
                continue;
            }
            own.load_front(batch);
        }

        debug!(
            "request-worker-{me} finished: {} queries, {} moved in",
            stats.processed, stats.moved
        );
        Ok(stats)
    }

    pub(crate) fn spawn<'scope>(
        &'scope self,
        scope: &'scope Scope<'scope, '_>,
    ) -> Result<Vec<(String, ScopedJoinHandle<'scope, Result<WorkerStats>>)>> {
        (0..self.workers())
            .map(|i| spawn_worker(scope, format!("request-worker-{i}"), move || self.work(i)))
            .collect()
    }
}

/// Resolve queries on the calling thread, in input order
pub fn process_sequential(
    processor: &QueryProcessor<'_>,
    queries: Vec<Query>,
    sink: &dyn OutcomeSink,
) -> Result<WorkerStats> {
    let mut stats = WorkerStats::default();
    for query in queries {
        let outcome: QueryOutcome = processor.resolve(query);
        stats.processed += 1;
        if !outcome.is_ok() {
            stats.failures += 1;
        }
        sink.emit(outcome)?;
    }
    Ok(stats)
}
