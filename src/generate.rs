//! Synthetic workload generator
//!
//! Builds a complete directed flight map over a sample of cities and a
//! query set enumerating (origin, destination) pairs of that sample. The
//! sample holds `ceil(sqrt(n_queries)) + 10` cities, which always leaves
//! enough pairs for the requested number of queries.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::Price;
use crate::io::FlightRecord;
use crate::processor::Query;

/// Fare range used when none is given
pub const DEFAULT_PRICES: RangeInclusive<Price> = 100..=2000;

pub const FLIGHTS_FILE: &str = "flights.jsonl";
pub const QUERIES_FILE: &str = "queries.jsonl";

/// Entry of a city list file: `[{"name": ..., "country": ...}, ...]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityEntry {
    pub name: String,
    pub country: String,
}

impl CityEntry {
    /// "name, country"
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

/// Load display names from a city list, dropping duplicates
pub fn load_cities(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let entries: Vec<CityEntry> = serde_json::from_reader(BufReader::new(file))?;

    let mut seen = HashSet::new();
    let names: Vec<String> = entries
        .iter()
        .map(CityEntry::display_name)
        .filter(|name| seen.insert(name.clone()))
        .collect();
    debug!("Loaded {} cities from {}", names.len(), path.display());
    Ok(names)
}

pub fn cities_needed(n_queries: usize) -> usize {
    (n_queries as f64).sqrt().ceil() as usize + 10
}

#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub cities: Vec<String>,
    pub flights: Vec<FlightRecord>,
    pub queries: Vec<Query>,
}

/// Generate a workload of `n_queries` queries.
///
/// Cities are sampled from `cities`; a short or empty list is padded with
/// synthetic `City-NNNN` names. Prices are uniform over `prices`.
pub fn generate_workload(
    cities: &[String],
    n_queries: usize,
    prices: RangeInclusive<Price>,
    seed: Option<u64>,
) -> Result<Workload> {
    if prices.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "empty price range {}..={}",
            prices.start(),
            prices.end()
        )));
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let needed = cities_needed(n_queries);
    let mut sample: Vec<String> = cities
        .choose_multiple(&mut rng, needed.min(cities.len()))
        .cloned()
        .collect();
    let taken: HashSet<String> = sample.iter().cloned().collect();
    let mut next = 0usize;
    while sample.len() < needed {
        let name = format!("City-{next:04}");
        next += 1;
        if !taken.contains(&name) {
            sample.push(name);
        }
    }

    let mut flights = Vec::with_capacity(needed * (needed - 1));
    for origin in &sample {
        for destination in &sample {
            if origin != destination {
                flights.push(FlightRecord {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    price: rng.random_range(prices.clone()),
                });
            }
        }
    }

    let queries: Vec<Query> = sample
        .iter()
        .flat_map(|origin| sample.iter().map(move |destination| (origin, destination)))
        .take(n_queries)
        .zip(1u64..)
        .map(|((origin, destination), id)| Query::new(id, origin.clone(), destination.clone()))
        .collect();

    info!(
        "Generated {} cities, {} flights, {} queries",
        sample.len(),
        flights.len(),
        queries.len()
    );
    Ok(Workload {
        cities: sample,
        flights,
        queries,
    })
}

fn write_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n").map_err(|e| Error::io(path, e))?;
    }
    out.flush().map_err(|e| Error::io(path, e))
}

/// Write `flights.jsonl` and `queries.jsonl` into `dir`, creating it if needed.
/// Returns both paths.
pub fn write_workload(workload: &Workload, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let flights = dir.join(FLIGHTS_FILE);
    let queries = dir.join(QUERIES_FILE);
    write_lines(&flights, &workload.flights)?;
    write_lines(&queries, &workload.queries)?;
    Ok((flights, queries))
}
