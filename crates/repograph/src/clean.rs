//! Degree-based graph cleaning.
//!
//! Cleaning runs in two phases. First every node whose degree in the
//! *original* graph is below its threshold is marked. Then edges touching a
//! marked node are dropped, and the surviving node set is restricted to
//! unmarked nodes that still appear on a surviving edge. A node can thus
//! disappear for its own low degree or because all of its neighbours went.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::graph::{EDGES_FILE, Graph, NODES_FILE, NodeKind};
use crate::store::StoreError;

pub const CLEAN_NODES_FILE: &str = "clean_nodes.csv";
pub const CLEAN_EDGES_FILE: &str = "clean_edges.csv";

pub const DEFAULT_MIN_REPOSITORIES_PER_USER: usize = 10;
pub const DEFAULT_MIN_CONTRIBUTORS_PER_REPOSITORY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegreeThresholds {
    /// Users with fewer repository edges are removed.
    pub min_repositories_per_user: usize,
    /// Repositories with fewer contributor edges are removed.
    pub min_contributors_per_repository: usize,
}

impl Default for DegreeThresholds {
    fn default() -> Self {
        Self {
            min_repositories_per_user: DEFAULT_MIN_REPOSITORIES_PER_USER,
            min_contributors_per_repository: DEFAULT_MIN_CONTRIBUTORS_PER_REPOSITORY,
        }
    }
}

/// The cleaned graph and why nodes were removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub graph: Graph,
    /// Node ids removed for their own low degree.
    pub below_threshold: Vec<u64>,
    /// Node ids removed because none of their edges survived.
    pub disconnected: Vec<u64>,
}

/// Out-degree per source and in-degree per target.
pub fn degrees(graph: &Graph) -> (HashMap<u64, usize>, HashMap<u64, usize>) {
    let mut out_degree = HashMap::new();
    let mut in_degree = HashMap::new();
    for edge in &graph.edges {
        *out_degree.entry(edge.source).or_insert(0) += 1;
        *in_degree.entry(edge.target).or_insert(0) += 1;
    }
    (out_degree, in_degree)
}

pub fn clean(graph: &Graph, thresholds: DegreeThresholds) -> CleanReport {
    let (out_degree, in_degree) = degrees(graph);

    let marked: HashSet<u64> = graph
        .nodes
        .iter()
        .filter(|node| match node.kind {
            NodeKind::User => {
                out_degree.get(&node.id).copied().unwrap_or(0)
                    < thresholds.min_repositories_per_user
            }
            NodeKind::Repository => {
                in_degree.get(&node.id).copied().unwrap_or(0)
                    < thresholds.min_contributors_per_repository
            }
        })
        .map(|node| node.id)
        .collect();

    let edges: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| !marked.contains(&e.source) && !marked.contains(&e.target))
        .cloned()
        .collect();

    let linked: HashSet<u64> = edges.iter().flat_map(|e| [e.source, e.target]).collect();

    let mut nodes = Vec::new();
    let mut below_threshold = Vec::new();
    let mut disconnected = Vec::new();
    for node in &graph.nodes {
        if marked.contains(&node.id) {
            below_threshold.push(node.id);
        } else if !linked.contains(&node.id) {
            disconnected.push(node.id);
        } else {
            nodes.push(node.clone());
        }
    }

    CleanReport {
        graph: Graph { nodes, edges },
        below_threshold,
        disconnected,
    }
}

/// Clean the `nodes.csv`/`edges.csv` pair in `source` and write
/// `clean_nodes.csv`/`clean_edges.csv` into `destination`.
pub fn clean_files(
    source: &Path,
    destination: &Path,
    thresholds: DegreeThresholds,
) -> Result<CleanReport, StoreError> {
    let graph = Graph::read(&source.join(NODES_FILE), &source.join(EDGES_FILE))?;
    let report = clean(&graph, thresholds);
    report.graph.write(
        &destination.join(CLEAN_NODES_FILE),
        &destination.join(CLEAN_EDGES_FILE),
    )?;

    tracing::info!(
        nodes = report.graph.nodes.len(),
        edges = report.graph.edges.len(),
        below_threshold = report.below_threshold.len(),
        disconnected = report.disconnected.len(),
        destination = %destination.display(),
        "Wrote cleaned graph"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};

    fn node(id: u64, kind: NodeKind) -> Node {
        Node {
            id,
            label: format!("n{id}"),
            kind,
        }
    }

    fn edge(source: u64, target: u64) -> Edge {
        Edge {
            source,
            target,
            weight: None,
        }
    }

    /// u1, u2 -> R1; u3 -> R2.
    fn scenario() -> Graph {
        Graph {
            nodes: vec![
                node(0, NodeKind::User),
                node(1, NodeKind::User),
                node(2, NodeKind::User),
                node(3, NodeKind::Repository),
                node(4, NodeKind::Repository),
            ],
            edges: vec![edge(0, 3), edge(1, 3), edge(2, 4)],
        }
    }

    #[test]
    fn low_degree_repository_takes_its_only_user_along() {
        let report = clean(
            &scenario(),
            DegreeThresholds {
                min_repositories_per_user: 1,
                min_contributors_per_repository: 2,
            },
        );

        let ids: Vec<u64> = report.graph.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1, 3]);
        assert_eq!(report.graph.edges, vec![edge(0, 3), edge(1, 3)]);
        assert_eq!(report.below_threshold, vec![4]);
        assert_eq!(report.disconnected, vec![2]);
    }

    #[test]
    fn thresholds_use_original_degrees() {
        // u0 -> R2, R3; u1 -> R2. R3 has a single contributor.
        let graph = Graph {
            nodes: vec![
                node(0, NodeKind::User),
                node(1, NodeKind::User),
                node(2, NodeKind::Repository),
                node(3, NodeKind::Repository),
            ],
            edges: vec![edge(0, 2), edge(0, 3), edge(1, 2)],
        };
        let report = clean(
            &graph,
            DegreeThresholds {
                min_repositories_per_user: 2,
                min_contributors_per_repository: 2,
            },
        );

        // u0 keeps its original out-degree of 2 after R3 goes, and R2 keeps
        // its original in-degree of 2 after u1 goes.
        let ids: Vec<u64> = report.graph.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(report.graph.edges, vec![edge(0, 2)]);
        assert_eq!(report.below_threshold, vec![1, 3]);
        assert!(report.disconnected.is_empty());
    }

    #[test]
    fn above_threshold_node_is_pruned_when_neighbours_go() {
        // u0 has degree 2, but both of its repositories are below threshold.
        let graph = Graph {
            nodes: vec![
                node(0, NodeKind::User),
                node(1, NodeKind::Repository),
                node(2, NodeKind::Repository),
            ],
            edges: vec![edge(0, 1), edge(0, 2)],
        };
        let report = clean(
            &graph,
            DegreeThresholds {
                min_repositories_per_user: 2,
                min_contributors_per_repository: 2,
            },
        );

        assert!(report.graph.nodes.is_empty());
        assert!(report.graph.edges.is_empty());
        assert_eq!(report.below_threshold, vec![1, 2]);
        assert_eq!(report.disconnected, vec![0]);
    }

    #[test]
    fn zero_thresholds_only_drop_isolated_nodes() {
        let mut graph = scenario();
        graph.nodes.push(node(5, NodeKind::User));
        let report = clean(
            &graph,
            DegreeThresholds {
                min_repositories_per_user: 0,
                min_contributors_per_repository: 0,
            },
        );

        assert_eq!(report.graph.nodes.len(), 5);
        assert_eq!(report.graph.edges.len(), 3);
        assert_eq!(report.disconnected, vec![5]);
    }

    #[test]
    fn surviving_nodes_satisfy_invariants() {
        let graph = scenario();
        for tu in 0..3 {
            for tr in 0..3 {
                let thresholds = DegreeThresholds {
                    min_repositories_per_user: tu,
                    min_contributors_per_repository: tr,
                };
                let report = clean(&graph, thresholds);
                let (out_degree, in_degree) = degrees(&graph);
                let kept: HashSet<u64> = report.graph.nodes.iter().map(|n| n.id).collect();

                for node in &report.graph.nodes {
                    match node.kind {
                        NodeKind::User => assert!(out_degree[&node.id] >= tu),
                        NodeKind::Repository => assert!(in_degree[&node.id] >= tr),
                    }
                    assert!(
                        report
                            .graph
                            .edges
                            .iter()
                            .any(|e| e.source == node.id || e.target == node.id)
                    );
                }
                for edge in &report.graph.edges {
                    assert!(kept.contains(&edge.source) && kept.contains(&edge.target));
                }
            }
        }
    }
}
