//! Query resolution against the result matrix
//!
//! This is where the two pools meet: a request worker looks up the cell for
//! its (origin, destination) pair and blocks until the path-computation
//! worker owning that origin has published the row.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{FlightGraph, Price};
use crate::matrix::ResultMatrix;

/// Customer route request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: u64,
    pub origin: String,
    pub destination: String,
}

impl Query {
    pub fn new(id: u64, origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            id,
            origin: origin.into(),
            destination: destination.into(),
        }
    }
}

/// Resolved query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: u64,
    pub origin: String,
    pub destination: String,
    pub price: Price,
    pub path: Vec<String>,
}

/// Per-query result: an itinerary, or the reason the query failed
#[derive(Debug)]
pub struct QueryOutcome {
    pub query: Query,
    pub result: Result<Itinerary>,
}

impl QueryOutcome {
    pub fn id(&self) -> u64 {
        self.query.id
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct QueryProcessor<'a> {
    graph: &'a FlightGraph,
    matrix: &'a ResultMatrix,
}

impl<'a> QueryProcessor<'a> {
    pub fn new(graph: &'a FlightGraph, matrix: &'a ResultMatrix) -> Self {
        Self { graph, matrix }
    }

    /// Resolve one query, blocking until its matrix row is published.
    /// Unknown cities fail with [`crate::Error::UnknownCity`] before any wait.
    pub fn process(&self, query: &Query) -> Result<Itinerary> {
        let from = self.graph.require(&query.origin)?;
        let to = self.graph.require(&query.destination)?;

        let record = self.matrix.wait(from, to);
        Ok(Itinerary {
            id: query.id,
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            price: record.price,
            path: record.path.clone(),
        })
    }

    /// Same as [`process`](Self::process) but keeps the query alongside the result
    pub fn resolve(&self, query: Query) -> QueryOutcome {
        let result = self.process(&query);
        if let Err(err) = &result {
            log::debug!("Query {} failed: {}", query.id, err);
        }
        QueryOutcome { query, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dijkstra::ShortestPathEngine;
    use crate::error::Error;
    use crate::graph::GraphBuilder;
    use std::thread;
    use std::time::Duration;

    fn graph() -> FlightGraph {
        let mut builder = GraphBuilder::new();
        builder.add_edge("A", "B", 10);
        builder.add_edge("B", "C", 10);
        builder.add_edge("A", "C", 25);
        builder.build_index()
    }

    fn fill(graph: &FlightGraph, matrix: &ResultMatrix) {
        let engine = ShortestPathEngine::new(graph);
        for source in 0..graph.n_cities() {
            matrix
                .publish_row(source, engine.shortest_paths_from(source))
                .unwrap();
        }
    }

    #[test]
    fn test_process_resolved_query() {
        let g = graph();
        let matrix = ResultMatrix::new(g.n_cities());
        fill(&g, &matrix);

        let processor = QueryProcessor::new(&g, &matrix);
        let itinerary = processor.process(&Query::new(1, "A", "C")).unwrap();
        assert_eq!(itinerary.id, 1);
        assert_eq!(itinerary.price, 20);
        assert_eq!(itinerary.path, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unknown_destination_is_explicit_failure() {
        let g = graph();
        let matrix = ResultMatrix::new(g.n_cities());
        let processor = QueryProcessor::new(&g, &matrix);

        // Matrix is empty: an unknown city must fail without waiting
        let outcome = processor.resolve(Query::new(7, "A", "Zanzibar"));
        assert_eq!(outcome.id(), 7);
        assert!(!outcome.is_ok());
        match outcome.result {
            Err(Error::UnknownCity(city)) => assert_eq!(city, "Zanzibar"),
            other => panic!("Expected UnknownCity, got {:?}", other),
        }
    }

    #[test]
    fn test_process_blocks_until_row_published() {
        let g = graph();
        let matrix = ResultMatrix::new(g.n_cities());

        thread::scope(|s| {
            let reader = s.spawn(|| {
                QueryProcessor::new(&g, &matrix)
                    .process(&Query::new(3, "A", "B"))
                    .unwrap()
            });
            thread::sleep(Duration::from_millis(20));
            fill(&g, &matrix);
            assert_eq!(reader.join().unwrap().price, 10);
        });
    }

    #[test]
    fn test_itinerary_json_shape() {
        let itinerary = Itinerary {
            id: 4,
            origin: "A".into(),
            destination: "B".into(),
            price: 10,
            path: vec!["A".into(), "B".into()],
        };
        let json = serde_json::to_string(&itinerary).unwrap();
        assert_eq!(
            json,
            r#"{"id":4,"origin":"A","destination":"B","price":10,"path":["A","B"]}"#
        );
    }
}
