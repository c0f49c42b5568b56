//! # Flight-fares CLI
//!
//! Command-line interface for the flight-fares library.
//! Resolves cheapest-fare queries over a flight map, generates synthetic
//! workloads, and measures parallel speedup.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flight_fares::bench::run_benchmark;
use flight_fares::generate::{generate_workload, load_cities, write_workload};
use flight_fares::{
    build_graph, read_flights, read_queries, EngineConfig, FlightGraph, JsonLinesSink,
    OutcomeSink, Query, DEFAULT_THRESHOLD,
};
use log::{error, info};

mod cli;

/// Command-line interface for flight-fares
#[derive(Parser)]
#[command(name = "flight-fares")]
#[command(about = "Concurrent cheapest-route engine for flight networks")]
#[command(long_about = "Finds the cheapest itinerary for every customer query:
  flight-fares run flights.jsonl queries.jsonl              # Sequential
  flight-fares run flights.jsonl queries.jsonl -t 8         # Parallel, 8 workers per pool
  flight-fares generate data/ --queries 10000               # Synthetic workload
  flight-fares bench flights.jsonl queries.jsonl -t 1,2,4,8 # Speedup table

Input files hold one JSON object per line:
  flights: {\"origin\": \"A\", \"destination\": \"B\", \"price\": 120}
  queries: {\"id\": 1, \"origin\": \"A\", \"destination\": \"B\"}")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every query and print one JSON result per line
    Run {
        /// Flight map (JSON lines)
        flights: PathBuf,

        /// Customer queries (JSON lines)
        queries: PathBuf,

        /// Workers per pool; omit for sequential mode
        #[arg(short, long)]
        threads: Option<usize>,

        /// Minimum backlog difference before work is shared
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: usize,

        /// Base seed for the balancer RNGs
        #[arg(long)]
        seed: Option<u64>,

        /// Output file, or stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show a progress bar on stderr
        #[arg(long)]
        progress: bool,
    },

    /// Write a synthetic flight map and query set
    Generate {
        /// Directory receiving flights.jsonl and queries.jsonl
        outdir: PathBuf,

        /// Number of queries to generate
        #[arg(short, long)]
        queries: usize,

        /// City list: JSON array of {"name", "country"} objects
        #[arg(long)]
        cities: Option<PathBuf>,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Lowest fare
        #[arg(long, default_value_t = 100)]
        min_price: u64,

        /// Highest fare
        #[arg(long, default_value_t = 2000)]
        max_price: u64,
    },

    /// Time sequential and parallel runs and report the speedup
    Bench {
        /// Flight map (JSON lines)
        flights: PathBuf,

        /// Customer queries (JSON lines)
        queries: PathBuf,

        /// Thread counts to measure, comma separated
        #[arg(short, long, value_delimiter = ',')]
        threads: Vec<usize>,

        /// Runs per configuration
        #[arg(short, long, default_value_t = 5)]
        repeat: usize,

        /// Minimum backlog difference before work is shared
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr; results own stdout
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(cli) {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            flights,
            queries,
            threads,
            threshold,
            seed,
            output,
            progress,
        } => {
            let mut config = match threads {
                Some(n) => EngineConfig::parallel(n),
                None => EngineConfig::sequential(),
            }
            .with_threshold(threshold);
            config.seed = seed;
            config.validate()?;

            let (graph, queries) = load_inputs(&flights, &queries)?;
            run_queries(&graph, queries, &config, output.as_deref(), progress)
        }
        Command::Generate {
            outdir,
            queries,
            cities,
            seed,
            min_price,
            max_price,
        } => {
            let names = match &cities {
                Some(path) => load_cities(path)
                    .with_context(|| format!("Failed to load city list {}", path.display()))?,
                None => Vec::new(),
            };
            let workload = generate_workload(&names, queries, min_price..=max_price, seed)?;
            let (flights, queries) = write_workload(&workload, &outdir)?;
            eprintln!(
                "✅ {} flights -> {}, {} queries -> {}",
                workload.flights.len(),
                flights.display(),
                workload.queries.len(),
                queries.display()
            );
            Ok(())
        }
        Command::Bench {
            flights,
            queries,
            threads,
            repeat,
            threshold,
        } => {
            let threads = if threads.is_empty() {
                default_thread_counts(num_cpus::get())
            } else {
                threads
            };
            let (graph, queries) = load_inputs(&flights, &queries)?;
            let report = run_benchmark(&graph, &queries, &threads, repeat, threshold)?;
            println!(
                "{} queries, {} cities, {} runs per configuration",
                report.queries,
                graph.n_cities(),
                repeat
            );
            print!("{}", report.render());
            Ok(())
        }
    }
}

fn load_inputs(flights: &Path, queries: &Path) -> Result<(FlightGraph, Vec<Query>)> {
    let records = read_flights(flights)
        .with_context(|| format!("Failed to read flights from {}", flights.display()))?;
    let graph = build_graph(&records);
    let queries = read_queries(queries)
        .with_context(|| format!("Failed to read queries from {}", queries.display()))?;
    info!(
        "Loaded {} cities, {} flights, {} queries",
        graph.n_cities(),
        graph.n_edges(),
        queries.len()
    );
    Ok((graph, queries))
}

fn run_queries(
    graph: &FlightGraph,
    queries: Vec<Query>,
    config: &EngineConfig,
    output: Option<&Path>,
    progress: bool,
) -> Result<()> {
    let writer: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    let json = JsonLinesSink::new(writer);

    let total = queries.len() as u64;
    let sink: Box<dyn OutcomeSink> = if progress {
        Box::new(cli::ProgressSink::new(json, total, "Resolving queries"))
    } else {
        Box::new(json)
    };

    let report = flight_fares::run(graph, queries, config, sink.as_ref())?;
    if report.failures > 0 {
        eprintln!("⚠️  {} of {} queries failed", report.failures, report.processed);
    }
    Ok(())
}

/// 1, 2, 4, ... up to the number of CPUs, which is always included
fn default_thread_counts(cpus: usize) -> Vec<usize> {
    let cpus = cpus.max(1);
    let mut counts: Vec<usize> = std::iter::successors(Some(1usize), |n| n.checked_mul(2))
        .take_while(|&n| n < cpus)
        .collect();
    counts.push(cpus);
    counts
}
