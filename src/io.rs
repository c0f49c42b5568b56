//! JSON-lines ingestion and result emission
//!
//! Inputs are one JSON object per line. A line that does not parse is
//! logged and skipped so a single bad record never aborts a whole run.
//! Results go through an [`OutcomeSink`], which request workers share by
//! reference.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{FlightGraph, GraphBuilder, Price};
use crate::processor::{Query, QueryOutcome};

/// One priced, directed leg as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub origin: String,
    pub destination: String,
    pub price: Price,
}

fn parse_lines<T, R, E>(reader: R, kind: &str, read_err: E) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: BufRead,
    E: Fn(std::io::Error) -> Error,
{
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(&read_err)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str(trimmed) {
            Ok(record) => records.push(record),
            Err(err) => {
                skipped += 1;
                warn!("Skipping malformed {kind} record on line {}: {err}", idx + 1);
            }
        }
    }
    debug!("Parsed {} {kind} records ({skipped} skipped)", records.len());
    Ok(records)
}

/// Parse flight records from any buffered reader
pub fn parse_flights<R: BufRead>(reader: R) -> Result<Vec<FlightRecord>> {
    parse_lines(reader, "flight", Error::Read)
}

/// Parse query records, keeping file order
pub fn parse_queries<R: BufRead>(reader: R) -> Result<Vec<Query>> {
    parse_lines(reader, "query", Error::Read)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::io(path, e))
}

pub fn read_flights(path: impl AsRef<Path>) -> Result<Vec<FlightRecord>> {
    let path = path.as_ref();
    parse_lines(open(path)?, "flight", |e| Error::io(path, e))
}

pub fn read_queries(path: impl AsRef<Path>) -> Result<Vec<Query>> {
    let path = path.as_ref();
    parse_lines(open(path)?, "query", |e| Error::io(path, e))
}

/// Feed every record into a builder and freeze the index
pub fn build_graph(flights: &[FlightRecord]) -> FlightGraph {
    let mut builder = GraphBuilder::new();
    for flight in flights {
        builder.add_edge(&flight.origin, &flight.destination, flight.price);
    }
    builder.build_index()
}

/// Destination for per-query outcomes. Shared by all request workers.
pub trait OutcomeSink: Send + Sync {
    fn emit(&self, outcome: QueryOutcome) -> Result<()>;

    /// Flush buffered output; called once after the last outcome
    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every outcome in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    outcomes: Mutex<Vec<QueryOutcome>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.lock().is_empty()
    }

    /// Outcomes in emission order
    pub fn into_outcomes(self) -> Vec<QueryOutcome> {
        self.outcomes.into_inner()
    }
}

impl OutcomeSink for CollectingSink {
    fn emit(&self, outcome: QueryOutcome) -> Result<()> {
        self.outcomes.lock().push(outcome);
        Ok(())
    }
}

/// Counts outcomes and discards them
#[derive(Debug, Default)]
pub struct CountingSink {
    resolved: AtomicUsize,
    failed: AtomicUsize,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolved(&self) -> usize {
        self.resolved.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.resolved() + self.failed()
    }
}

impl OutcomeSink for CountingSink {
    fn emit(&self, outcome: QueryOutcome) -> Result<()> {
        let counter = if outcome.is_ok() {
            &self.resolved
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Serialize)]
struct FailureRecord<'a> {
    id: u64,
    origin: &'a str,
    destination: &'a str,
    error: String,
}

/// Writes one JSON object per outcome, one per line
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> OutcomeSink for JsonLinesSink<W> {
    fn emit(&self, outcome: QueryOutcome) -> Result<()> {
        // Encode before locking so workers only contend on the write itself
        let mut line = match &outcome.result {
            Ok(itinerary) => serde_json::to_vec(itinerary)?,
            Err(err) => serde_json::to_vec(&FailureRecord {
                id: outcome.query.id,
                origin: &outcome.query.origin,
                destination: &outcome.query.destination,
                error: err.to_string(),
            })?,
        };
        line.push(b'\n');
        self.out.lock().write_all(&line)?;
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.out.lock().flush()?;
        Ok(())
    }
}
