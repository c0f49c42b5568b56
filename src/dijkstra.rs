//! Single-source cheapest-fare search
//!
//! Lazy-deletion Dijkstra on a binary heap: improved labels are pushed again
//! and dominated entries are dropped when popped for an already settled city.
//! Entries with equal cost pop in insertion order, which makes the chosen
//! path deterministic when several routes share the cheapest price.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::{CityId, FlightGraph, Price};

/// Price reported for destinations that cannot be reached
pub const UNREACHABLE: Price = Price::MAX;

/// Cheapest route between one ordered pair of cities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    pub source: String,
    pub destination: String,
    /// Total fare, or [`UNREACHABLE`]
    pub price: Price,
    /// City names from source to destination inclusive.
    /// Unreachable destinations carry `[source]` only.
    pub path: Vec<String>,
}

impl PathRecord {
    pub fn is_reachable(&self) -> bool {
        self.price != UNREACHABLE
    }
}

// Heap entry for the lazy-deletion queue
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    cost: Price,
    seq: u64,
    city: CityId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; older entries win ties
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Settled labels of one search
#[derive(Debug, Clone)]
pub struct SearchTree {
    pub source: CityId,
    pub cost: Vec<Price>,
    pub parent: Vec<Option<CityId>>,
}

impl SearchTree {
    /// City ids from source to `target`, or `[source]` if unreachable
    pub fn path_to(&self, target: CityId) -> Vec<CityId> {
        if self.cost[target] == UNREACHABLE {
            return vec![self.source];
        }
        let mut path = vec![target];
        let mut current = target;
        while let Some(prev) = self.parent[current] {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }
}

/// Dijkstra runner over an immutable flight graph
pub struct ShortestPathEngine<'a> {
    graph: &'a FlightGraph,
}

impl<'a> ShortestPathEngine<'a> {
    pub fn new(graph: &'a FlightGraph) -> Self {
        Self { graph }
    }

    /// Run the search and return the raw label arrays
    pub fn search(&self, source: CityId) -> SearchTree {
        let n = self.graph.n_cities();
        let mut cost = vec![UNREACHABLE; n];
        let mut parent = vec![None; n];
        let mut settled = vec![false; n];
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;

        cost[source] = 0;
        heap.push(HeapEntry {
            cost: 0,
            seq,
            city: source,
        });

        while let Some(HeapEntry { cost: d, city, .. }) = heap.pop() {
            if settled[city] {
                continue;
            }
            settled[city] = true;

            for edge in self.graph.neighbors(city) {
                if settled[edge.to] {
                    continue;
                }
                let candidate = d.saturating_add(edge.price);
                if candidate < cost[edge.to] {
                    cost[edge.to] = candidate;
                    parent[edge.to] = Some(city);
                    seq += 1;
                    heap.push(HeapEntry {
                        cost: candidate,
                        seq,
                        city: edge.to,
                    });
                }
            }
        }

        SearchTree {
            source,
            cost,
            parent,
        }
    }

    /// One [`PathRecord`] per city in the graph, ordered by destination id
    pub fn shortest_paths_from(&self, source: CityId) -> Vec<PathRecord> {
        let tree = self.search(source);
        let source_name = self.graph.name(source);

        (0..self.graph.n_cities())
            .map(|target| PathRecord {
                source: source_name.to_string(),
                destination: self.graph.name(target).to_string(),
                price: tree.cost[target],
                path: tree
                    .path_to(target)
                    .into_iter()
                    .map(|id| self.graph.name(id).to_string())
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn graph(edges: &[(&str, &str, Price)]) -> FlightGraph {
        let mut builder = GraphBuilder::new();
        for &(from, to, price) in edges {
            builder.add_edge(from, to, price);
        }
        builder.build_index()
    }

    fn record<'r>(records: &'r [PathRecord], destination: &str) -> &'r PathRecord {
        records
            .iter()
            .find(|r| r.destination == destination)
            .expect("destination missing from result")
    }

    #[test]
    fn test_two_hops_beat_expensive_direct_leg() {
        let g = graph(&[("A", "B", 10), ("B", "C", 10), ("A", "C", 25)]);
        let engine = ShortestPathEngine::new(&g);
        let records = engine.shortest_paths_from(g.city_id("A").unwrap());

        let to_c = record(&records, "C");
        assert_eq!(to_c.price, 20);
        assert_eq!(to_c.path, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_every_city_gets_a_record() {
        let g = graph(&[("A", "B", 1), ("C", "A", 4), ("D", "E", 2)]);
        let engine = ShortestPathEngine::new(&g);
        let records = engine.shortest_paths_from(g.city_id("A").unwrap());
        assert_eq!(records.len(), g.n_cities());

        let own = record(&records, "A");
        assert_eq!(own.price, 0);
        assert_eq!(own.path, vec!["A"]);
    }

    #[test]
    fn test_unreachable_uses_sentinel() {
        let g = graph(&[("A", "B", 1), ("C", "A", 4)]);
        let engine = ShortestPathEngine::new(&g);
        let records = engine.shortest_paths_from(g.city_id("A").unwrap());

        let to_c = record(&records, "C");
        assert_eq!(to_c.price, UNREACHABLE);
        assert!(!to_c.is_reachable());
        assert_eq!(to_c.path, vec!["A"]);
    }

    #[test]
    fn test_destination_only_city_row() {
        let g = graph(&[("A", "B", 3)]);
        let engine = ShortestPathEngine::new(&g);
        let records = engine.shortest_paths_from(g.city_id("B").unwrap());

        assert_eq!(record(&records, "B").price, 0);
        assert_eq!(record(&records, "A").price, UNREACHABLE);
    }

    #[test]
    fn test_equal_cost_tie_keeps_first_discovered_path() {
        // S->X and S->Y are relaxed in insertion order; both reach T at 10.
        // X is settled first (pushed first), so S-X-T is found first and the
        // equal-cost S-Y-T never replaces it.
        let g = graph(&[
            ("S", "X", 5),
            ("S", "Y", 5),
            ("X", "T", 5),
            ("Y", "T", 5),
        ]);
        let engine = ShortestPathEngine::new(&g);
        let records = engine.shortest_paths_from(g.city_id("S").unwrap());

        let to_t = record(&records, "T");
        assert_eq!(to_t.price, 10);
        assert_eq!(to_t.path, vec!["S", "X", "T"]);
    }

    #[test]
    fn test_parallel_legs_take_cheapest() {
        let g = graph(&[("A", "B", 9), ("A", "B", 4)]);
        let engine = ShortestPathEngine::new(&g);
        let records = engine.shortest_paths_from(g.city_id("A").unwrap());
        assert_eq!(record(&records, "B").price, 4);
    }

    #[test]
    fn test_path_prices_match_edge_sums() {
        let g = graph(&[
            ("A", "B", 7),
            ("A", "C", 9),
            ("A", "F", 14),
            ("B", "C", 10),
            ("B", "D", 15),
            ("C", "D", 11),
            ("C", "F", 2),
            ("D", "E", 6),
            ("F", "E", 9),
        ]);
        let engine = ShortestPathEngine::new(&g);
        let records = engine.shortest_paths_from(g.city_id("A").unwrap());

        assert_eq!(record(&records, "E").price, 20);
        assert_eq!(record(&records, "D").price, 20);

        for r in records.iter().filter(|r| r.is_reachable()) {
            let ids: Vec<CityId> = r.path.iter().map(|n| g.city_id(n).unwrap()).collect();
            let total: Price = ids
                .windows(2)
                .map(|w| g.direct_price(w[0], w[1]).expect("path uses missing leg"))
                .sum();
            assert_eq!(total, r.price, "path {:?}", r.path);
        }
    }

    #[test]
    fn test_zero_price_legs() {
        let g = graph(&[("A", "B", 0), ("B", "C", 0), ("A", "C", 1)]);
        let engine = ShortestPathEngine::new(&g);
        let records = engine.shortest_paths_from(g.city_id("A").unwrap());
        let to_c = record(&records, "C");
        assert_eq!(to_c.price, 0);
        assert_eq!(to_c.path, vec!["A", "B", "C"]);
    }
}
