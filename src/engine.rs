//! Run orchestration
//!
//! Sequential mode fills the matrix on the calling thread, then resolves
//! queries in input order. Parallel mode starts both pools in one thread
//! scope: request workers begin immediately and block on cells that the
//! path workers have not published yet.

use std::thread;
use std::time::{Duration, Instant};

use log::info;

use crate::balancer::DEFAULT_THRESHOLD;
use crate::error::{Error, Result};
use crate::graph::FlightGraph;
use crate::io::OutcomeSink;
use crate::matrix::ResultMatrix;
use crate::pool::{
    compute_all_pairs_sequential, join_worker, process_sequential, PathComputationPool,
    RequestPool, WorkerStats,
};
use crate::processor::{Query, QueryProcessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// No pools; direct calls on the calling thread
    Sequential,
    /// Two pools of `workers` threads each
    Parallel { workers: usize },
}

impl ExecutionMode {
    pub fn workers(&self) -> usize {
        match self {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel { workers } => *workers,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub mode: ExecutionMode,
    /// Minimum deque length difference before the balancer moves work
    pub threshold: usize,
    /// Base seed for the per-worker RNGs; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            threshold: DEFAULT_THRESHOLD,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel(workers: usize) -> Self {
        Self {
            mode: ExecutionMode::Parallel { workers },
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let ExecutionMode::Parallel { workers: 0 } = self.mode {
            return Err(Error::InvalidConfig(
                "parallel mode needs at least one worker".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: ExecutionMode,
    pub processed: usize,
    pub failures: usize,
    pub rebalance_attempts: usize,
    pub moved: usize,
    pub elapsed: Duration,
}

/// Resolve every query against `graph`, sending each outcome to `sink`
pub fn run(
    graph: &FlightGraph,
    queries: Vec<Query>,
    config: &EngineConfig,
    sink: &dyn OutcomeSink,
) -> Result<RunReport> {
    config.validate()?;
    let started = Instant::now();
    let matrix = ResultMatrix::new(graph.n_cities());

    let stats = match config.mode {
        ExecutionMode::Sequential => {
            compute_all_pairs_sequential(graph, &matrix)?;
            process_sequential(&QueryProcessor::new(graph, &matrix), queries, sink)?
        }
        ExecutionMode::Parallel { workers } => {
            run_parallel(graph, &matrix, queries, workers, config, sink)?
        }
    };
    sink.finish()?;

    let report = RunReport {
        mode: config.mode,
        processed: stats.processed,
        failures: stats.failures,
        rebalance_attempts: stats.rebalance_attempts,
        moved: stats.moved,
        elapsed: started.elapsed(),
    };
    info!(
        "Resolved {} queries ({} failed) over {} cities in {:.2?} [{:?}, {} rebalances moved {}]",
        report.processed,
        report.failures,
        graph.n_cities(),
        report.elapsed,
        report.mode,
        report.rebalance_attempts,
        report.moved
    );
    Ok(report)
}

fn run_parallel(
    graph: &FlightGraph,
    matrix: &ResultMatrix,
    queries: Vec<Query>,
    workers: usize,
    config: &EngineConfig,
    sink: &dyn OutcomeSink,
) -> Result<WorkerStats> {
    let paths = PathComputationPool::new(graph, matrix, workers);
    let requests = RequestPool::new(
        queries,
        workers,
        QueryProcessor::new(graph, matrix),
        sink,
        config.threshold,
        config.seed,
    );

    thread::scope(|s| -> Result<WorkerStats> {
        let path_handles = paths.spawn(s)?;
        let request_handles = requests.spawn(s)?;

        for handle in path_handles {
            join_worker(handle)?;
        }
        let mut total = WorkerStats::default();
        for handle in request_handles {
            total.merge(join_worker(handle)?);
        }
        Ok(total)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::io::{CollectingSink, CountingSink};

    fn graph() -> FlightGraph {
        let mut builder = GraphBuilder::new();
        builder.add_edge("A", "B", 10);
        builder.add_edge("B", "C", 10);
        builder.add_edge("A", "C", 25);
        builder.add_edge("C", "A", 3);
        builder.build_index()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.mode, ExecutionMode::Sequential);
        assert_eq!(config.threshold, 5);
        assert_eq!(config.seed, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let sink = CountingSink::new();
        match run(&graph(), Vec::new(), &EngineConfig::parallel(0), &sink) {
            Err(Error::InvalidConfig(_)) => {}
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let g = graph();
        let queries: Vec<Query> = ["A", "B", "C"]
            .iter()
            .flat_map(|o| ["A", "B", "C"].iter().map(move |d| (*o, *d)))
            .enumerate()
            .map(|(i, (o, d))| Query::new(i as u64 + 1, o, d))
            .collect();

        let seq_sink = CollectingSink::new();
        run(&g, queries.clone(), &EngineConfig::sequential(), &seq_sink).unwrap();

        let par_sink = CollectingSink::new();
        let report = run(
            &g,
            queries,
            &EngineConfig::parallel(3).with_seed(42).with_threshold(0),
            &par_sink,
        )
        .unwrap();
        assert_eq!(report.processed, 9);
        assert_eq!(report.failures, 0);

        let mut seq: Vec<(u64, u64)> = seq_sink
            .into_outcomes()
            .into_iter()
            .map(|o| (o.id(), o.result.unwrap().price))
            .collect();
        let mut par: Vec<(u64, u64)> = par_sink
            .into_outcomes()
            .into_iter()
            .map(|o| (o.id(), o.result.unwrap().price))
            .collect();
        // Sequential output already follows input order
        assert!(seq.windows(2).all(|w| w[0].0 < w[1].0));
        seq.sort_unstable();
        par.sort_unstable();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_empty_query_set() {
        let sink = CountingSink::new();
        let report = run(&graph(), Vec::new(), &EngineConfig::parallel(2), &sink).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(sink.total(), 0);
    }
}
