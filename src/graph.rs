//! Flight graph
//!
//! Two-phase construction: a mutable [`GraphBuilder`] collects directed
//! edges, then [`GraphBuilder::build_index`] assigns dense city ids in
//! ascending name order and freezes everything into an immutable
//! [`FlightGraph`] that worker pools share by reference.

use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};

/// Dense city identifier, assigned by sorted city name
pub type CityId = usize;

/// Ticket price / accumulated route cost
pub type Price = u64;

/// A directed, priced flight leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub to: CityId,
    pub price: Price,
}

/// Mutable edge collector used before the index exists
#[derive(Debug, Default)]
pub struct GraphBuilder {
    // origin -> (destination, price) in insertion order
    legs: HashMap<String, Vec<(String, Price)>>,
    // destinations that never appear as an origin
    cities: BTreeSet<String>,
    n_edges: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directed edge. No reverse edge is implied.
    pub fn add_edge(&mut self, origin: &str, destination: &str, price: Price) {
        self.cities.insert(origin.to_string());
        self.cities.insert(destination.to_string());
        self.legs
            .entry(origin.to_string())
            .or_default()
            .push((destination.to_string(), price));
        self.n_edges += 1;
    }

    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    /// Assign ids by sorting city names and freeze the graph.
    ///
    /// Cities that only ever appear as a destination are indexed too: they
    /// get an empty adjacency list and a row of their own.
    pub fn build_index(self) -> FlightGraph {
        // BTreeSet iteration is already lexicographic
        let names: Vec<String> = self.cities.into_iter().collect();
        let index: HashMap<String, CityId> = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id))
            .collect();

        let mut adjacency: Vec<Vec<Edge>> = vec![Vec::new(); names.len()];
        for (origin, legs) in self.legs {
            let from = index[&origin];
            adjacency[from] = legs
                .into_iter()
                .map(|(destination, price)| Edge {
                    to: index[&destination],
                    price,
                })
                .collect();
        }

        log::debug!(
            "Indexed flight graph: {} cities, {} edges",
            names.len(),
            self.n_edges
        );

        FlightGraph {
            names,
            index,
            adjacency,
            n_edges: self.n_edges,
        }
    }
}

/// Immutable, indexed flight graph
#[derive(Debug)]
pub struct FlightGraph {
    names: Vec<String>,
    index: HashMap<String, CityId>,
    adjacency: Vec<Vec<Edge>>,
    n_edges: usize,
}

impl FlightGraph {
    pub fn n_cities(&self) -> usize {
        self.names.len()
    }

    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    /// Id of a city, if the graph knows it
    pub fn city_id(&self, name: &str) -> Option<CityId> {
        self.index.get(name).copied()
    }

    /// Id of a city, failing with [`Error::UnknownCity`]
    pub fn require(&self, name: &str) -> Result<CityId> {
        self.city_id(name)
            .ok_or_else(|| Error::UnknownCity(name.to_string()))
    }

    pub fn name(&self, id: CityId) -> &str {
        &self.names[id]
    }

    /// City names ordered by id
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Outgoing legs of a city, in insertion order
    pub fn neighbors(&self, id: CityId) -> &[Edge] {
        &self.adjacency[id]
    }

    /// Cheapest direct leg between two cities, if any
    pub fn direct_price(&self, from: CityId, to: CityId) -> Option<Price> {
        self.adjacency[from]
            .iter()
            .filter(|e| e.to == to)
            .map(|e| e.price)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> FlightGraph {
        let mut builder = GraphBuilder::new();
        builder.add_edge("Chicago", "Boston", 10);
        builder.add_edge("Boston", "Austin", 10);
        builder.add_edge("Chicago", "Austin", 25);
        builder.build_index()
    }

    #[test]
    fn test_ids_follow_sorted_names() {
        let graph = triangle();
        assert_eq!(graph.names(), &["Austin", "Boston", "Chicago"]);
        assert_eq!(graph.city_id("Austin"), Some(0));
        assert_eq!(graph.city_id("Boston"), Some(1));
        assert_eq!(graph.city_id("Chicago"), Some(2));
    }

    #[test]
    fn test_edges_are_directed() {
        let graph = triangle();
        let chicago = graph.city_id("Chicago").unwrap();
        let boston = graph.city_id("Boston").unwrap();
        assert_eq!(graph.direct_price(chicago, boston), Some(10));
        assert_eq!(graph.direct_price(boston, chicago), None);
    }

    #[test]
    fn test_neighbors_keep_insertion_order() {
        let graph = triangle();
        let chicago = graph.city_id("Chicago").unwrap();
        let targets: Vec<&str> = graph
            .neighbors(chicago)
            .iter()
            .map(|e| graph.name(e.to))
            .collect();
        assert_eq!(targets, vec!["Boston", "Austin"]);
    }

    #[test]
    fn test_destination_only_city_is_indexed() {
        let graph = triangle();
        // Austin never departs anywhere but still has an id and empty legs
        let austin = graph.city_id("Austin").unwrap();
        assert!(graph.neighbors(austin).is_empty());
        assert_eq!(graph.n_cities(), 3);
        assert_eq!(graph.n_edges(), 3);
    }

    #[test]
    fn test_require_unknown_city() {
        let graph = triangle();
        match graph.require("Denver") {
            Err(Error::UnknownCity(name)) => assert_eq!(name, "Denver"),
            other => panic!("Expected UnknownCity, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = GraphBuilder::new().build_index();
        assert_eq!(graph.n_cities(), 0);
        assert_eq!(graph.city_id("anything"), None);
    }
}
