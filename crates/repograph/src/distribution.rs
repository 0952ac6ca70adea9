//! Degree distributions of a contribution graph.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::clean::degrees;
use crate::graph::{Graph, NodeKind};

/// Histogram of node degrees: degree -> number of nodes with that degree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub counts: BTreeMap<usize, usize>,
}

impl Histogram {
    fn from_degrees(degrees: impl IntoIterator<Item = usize>) -> Self {
        let mut counts = BTreeMap::new();
        for degree in degrees {
            *counts.entry(degree).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn max_degree(&self) -> Option<usize> {
        self.counts.keys().next_back().copied()
    }

    pub fn nodes(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        let nodes = self.nodes();
        (nodes > 0).then(|| {
            let total: usize = self.counts.iter().map(|(d, n)| d * n).sum();
            total as f64 / nodes as f64
        })
    }
}

/// Repositories per user and contributors per repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DegreeDistribution {
    pub repositories_per_user: Histogram,
    pub contributors_per_repository: Histogram,
}

impl DegreeDistribution {
    /// Compute both histograms. Nodes without edges count as degree 0.
    pub fn from_graph(graph: &Graph) -> Self {
        let (out_degree, in_degree) = degrees(graph);
        let degree_of = |kind: NodeKind| {
            let table = match kind {
                NodeKind::User => &out_degree,
                NodeKind::Repository => &in_degree,
            };
            graph
                .nodes
                .iter()
                .filter(move |n| n.kind == kind)
                .map(move |n| table.get(&n.id).copied().unwrap_or(0))
        };

        Self {
            repositories_per_user: Histogram::from_degrees(degree_of(NodeKind::User)),
            contributors_per_repository: Histogram::from_degrees(degree_of(
                NodeKind::Repository,
            )),
        }
    }
}
