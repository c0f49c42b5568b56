//! # Flight-fares Library
//!
//! A concurrent cheapest-route engine for flight networks. All-pairs
//! cheapest fares are computed by a pool of Dijkstra workers while a second
//! pool answers customer queries as soon as the rows they need are
//! published.
//!
//! ## Features
//!
//! - **Write-once result matrix**: query workers block on individual cells,
//!   never on the whole computation
//! - **Work sharing**: request workers even out their backlogs with random
//!   peers, locking deques in a global order
//! - **Sequential mode**: the same results on one thread, in input order
//! - **JSON lines** in and out
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use flight_fares::{build_graph, read_flights, read_queries, run, EngineConfig, JsonLinesSink};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let graph = build_graph(&read_flights("flights.jsonl")?);
//!     let queries = read_queries("queries.jsonl")?;
//!
//!     let sink = JsonLinesSink::new(std::io::stdout());
//!     let report = run(&graph, queries, &EngineConfig::parallel(4), &sink)?;
//!     eprintln!("{} queries in {:?}", report.processed, report.elapsed);
//!     Ok(())
//! }
//! ```

pub mod balancer;
pub mod bench;
pub mod deque;
pub mod dijkstra;
pub mod engine;
pub mod error;
pub mod generate;
pub mod graph;
pub mod io;
pub mod matrix;
pub mod pool;
pub mod processor;
pub mod queue;

pub use balancer::{BalanceOutcome, WorkSharingBalancer, DEFAULT_THRESHOLD};
pub use dijkstra::{PathRecord, ShortestPathEngine, UNREACHABLE};
pub use engine::{run, EngineConfig, ExecutionMode, RunReport};
pub use error::{Error, Result};
pub use graph::{CityId, FlightGraph, GraphBuilder, Price};
pub use io::{
    build_graph, read_flights, read_queries, CollectingSink, CountingSink, FlightRecord,
    JsonLinesSink, OutcomeSink,
};
pub use matrix::{FutureCell, ResultMatrix};
pub use processor::{Itinerary, Query, QueryOutcome, QueryProcessor};
