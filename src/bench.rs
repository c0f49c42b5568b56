//! Speedup benchmark
//!
//! Times a sequential baseline and a series of parallel runs per thread
//! count. Wall-clock times go into an HDR histogram (microseconds); the
//! speedup compares medians.

use std::time::Duration;

use hdrhistogram::Histogram;
use log::info;

use crate::engine::{run, EngineConfig};
use crate::error::{Error, Result};
use crate::graph::FlightGraph;
use crate::io::CountingSink;
use crate::processor::Query;

/// Timing summary for one configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BenchRow {
    /// `None` for the sequential baseline
    pub threads: Option<usize>,
    pub runs: u64,
    pub min: Duration,
    pub p50: Duration,
    pub max: Duration,
    /// Sequential median divided by this row's median
    pub speedup: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub queries: usize,
    pub baseline: BenchRow,
    pub rows: Vec<BenchRow>,
}

impl BenchReport {
    /// Fixed-width table, one line per configuration
    pub fn render(&self) -> String {
        let mut out = format!(
            "{:>8}  {:>5}  {:>12}  {:>12}  {:>12}  {:>8}\n",
            "threads", "runs", "min", "p50", "max", "speedup"
        );
        for row in std::iter::once(&self.baseline).chain(&self.rows) {
            let threads = row
                .threads
                .map_or_else(|| "seq".to_string(), |t| t.to_string());
            out.push_str(&format!(
                "{:>8}  {:>5}  {:>12}  {:>12}  {:>12}  {:>7.2}x\n",
                threads,
                row.runs,
                format!("{:.2?}", row.min),
                format!("{:.2?}", row.p50),
                format!("{:.2?}", row.max),
                row.speedup
            ));
        }
        out
    }
}

fn new_histogram() -> Result<Histogram<u64>> {
    Histogram::<u64>::new(3).map_err(|e| Error::Histogram(e.to_string()))
}

fn time_runs(
    graph: &FlightGraph,
    queries: &[Query],
    config: &EngineConfig,
    repeat: usize,
) -> Result<Histogram<u64>> {
    let mut hist = new_histogram()?;
    for _ in 0..repeat {
        let sink = CountingSink::new();
        let report = run(graph, queries.to_vec(), config, &sink)?;
        hist.record(report.elapsed.as_micros().max(1) as u64)
            .map_err(|e| Error::Histogram(e.to_string()))?;
    }
    Ok(hist)
}

fn row(threads: Option<usize>, hist: &Histogram<u64>, baseline_p50: u64) -> BenchRow {
    let p50 = hist.value_at_quantile(0.50);
    BenchRow {
        threads,
        runs: hist.len(),
        min: Duration::from_micros(hist.min()),
        p50: Duration::from_micros(p50),
        max: Duration::from_micros(hist.max()),
        speedup: baseline_p50 as f64 / p50.max(1) as f64,
    }
}

/// Time `repeat` sequential runs, then `repeat` parallel runs per entry of `threads`
pub fn run_benchmark(
    graph: &FlightGraph,
    queries: &[Query],
    threads: &[usize],
    repeat: usize,
    threshold: usize,
) -> Result<BenchReport> {
    if repeat == 0 {
        return Err(Error::InvalidConfig("repeat must be at least 1".to_string()));
    }

    let sequential = EngineConfig::sequential().with_threshold(threshold);
    let seq_hist = time_runs(graph, queries, &sequential, repeat)?;
    let baseline_p50 = seq_hist.value_at_quantile(0.50);
    let baseline = row(None, &seq_hist, baseline_p50);
    info!("Sequential baseline p50 {:.2?}", baseline.p50);

    let mut rows = Vec::with_capacity(threads.len());
    for &n in threads {
        let config = EngineConfig::parallel(n).with_threshold(threshold);
        let hist = time_runs(graph, queries, &config, repeat)?;
        let r = row(Some(n), &hist, baseline_p50);
        info!("{n} threads: p50 {:.2?}, speedup {:.2}x", r.p50, r.speedup);
        rows.push(r);
    }

    Ok(BenchReport {
        queries: queries.len(),
        baseline,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{generate_workload, DEFAULT_PRICES};
    use crate::io::build_graph;

    #[test]
    fn test_benchmark_rows() {
        let workload = generate_workload(&[], 25, DEFAULT_PRICES, Some(2)).unwrap();
        let graph = build_graph(&workload.flights);

        let report = run_benchmark(&graph, &workload.queries, &[1, 2], 2, 5).unwrap();
        assert_eq!(report.queries, 25);
        assert_eq!(report.baseline.threads, None);
        assert_eq!(report.baseline.runs, 2);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1].threads, Some(2));
        assert!(report.rows.iter().all(|r| r.min <= r.p50 && r.p50 <= r.max));

        let table = report.render();
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("seq"));
    }

    #[test]
    fn test_zero_repeat_rejected() {
        let graph = build_graph(&[]);
        assert!(matches!(
            run_benchmark(&graph, &[], &[1], 0, 5),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_threads_propagates_config_error() {
        let graph = build_graph(&[]);
        assert!(matches!(
            run_benchmark(&graph, &[], &[0], 1, 5),
            Err(Error::InvalidConfig(_))
        ));
    }
}
