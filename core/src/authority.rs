//! Link-based document authority, computed PageRank-style over the link graph
//! recorded in the store.

use crate::persist::Store;
use crate::{DocId, Result};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy)]
pub struct AuthorityParams {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for AuthorityParams {
    fn default() -> Self {
        Self { damping: 0.85, max_iterations: 10, tolerance: 1e-5 }
    }
}

/// A point-in-time copy of the link graph. Parents outside the known
/// document set are dropped.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    docs: Vec<DocId>,
    incoming: HashMap<DocId, Vec<DocId>>,
    out_degree: HashMap<DocId, usize>,
}

impl LinkGraph {
    pub fn snapshot<S: Store + ?Sized>(store: &S, docs: &BTreeSet<DocId>) -> Result<Self> {
        let mut graph = LinkGraph { docs: docs.iter().copied().collect(), ..Default::default() };
        for &doc in docs {
            let parents: Vec<DocId> = store.get_incoming_links(doc)?.into_iter().filter(|p| docs.contains(p)).collect();
            graph.incoming.insert(doc, parents);
            graph.out_degree.insert(doc, store.get_outgoing_links(doc)?.len());
        }
        Ok(graph)
    }

    /// Build from `(parent, child)` edges.
    pub fn from_edges(docs: impl IntoIterator<Item = DocId>, edges: &[(DocId, DocId)]) -> Self {
        let docs: BTreeSet<DocId> = docs.into_iter().collect();
        let mut graph = LinkGraph { docs: docs.iter().copied().collect(), ..Default::default() };
        let mut seen = BTreeSet::new();
        for &(parent, child) in edges {
            if !seen.insert((parent, child)) {
                continue;
            }
            *graph.out_degree.entry(parent).or_insert(0) += 1;
            if docs.contains(&parent) && docs.contains(&child) {
                graph.incoming.entry(child).or_default().push(parent);
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Scores summing to 1. An empty graph yields an empty map.
pub fn compute(graph: &LinkGraph, params: AuthorityParams) -> HashMap<DocId, f64> {
    let n = graph.docs.len();
    if n == 0 {
        return HashMap::new();
    }
    let n_f = n as f64;
    let d = params.damping;
    let mut scores: HashMap<DocId, f64> = graph.docs.iter().map(|&doc| (doc, 1.0 / n_f)).collect();

    for round in 0..params.max_iterations {
        let mut next = HashMap::with_capacity(n);
        let mut delta = 0.0;
        for &doc in &graph.docs {
            let inflow: f64 = graph
                .incoming
                .get(&doc)
                .map(|parents| {
                    parents
                        .iter()
                        .map(|p| scores[p] / graph.out_degree.get(p).copied().unwrap_or(0).max(1) as f64)
                        .sum::<f64>()
                })
                .unwrap_or(0.0);
            let score = (1.0 - d) / n_f + d * inflow;
            delta += (score - scores[&doc]).abs();
            next.insert(doc, score);
        }
        scores = next;
        if delta < params.tolerance {
            tracing::debug!(round, delta, "authority converged");
            break;
        }
    }

    let total: f64 = scores.values().sum();
    if total > 0.0 {
        for score in scores.values_mut() {
            *score /= total;
        }
    }
    scores
}
