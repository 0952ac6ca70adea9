//! Bipartite user/repository graph in Gephi's CSV import format.
//!
//! `nodes.csv` has the columns `id,label,type` and `edges.csv` has
//! `Source,Target,Weight`. Edges always point from a user to a repository.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::{ResultsDir, StagedFiles, StoreError, require, steps};
use crate::tables::Tables;

pub const NODES_FILE: &str = "nodes.csv";
pub const EDGES_FILE: &str = "edges.csv";

const NODE_HEADER: [&str; 3] = ["id", "label", "type"];
const EDGE_HEADER: [&str; 3] = ["Source", "Target", "Weight"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    User,
    Repository,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// User node id.
    #[serde(rename = "Source")]
    pub source: u64,
    /// Repository node id.
    #[serde(rename = "Target")]
    pub target: u64,
    #[serde(rename = "Weight")]
    pub weight: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Counts from one materialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    pub users: usize,
    pub repositories: usize,
    pub edges: usize,
    /// Contributions naming a user or repository absent from the tables.
    pub dangling: usize,
}

impl Graph {
    /// Build the graph from tables, renumbering ids densely in encounter
    /// order: users first, then repositories.
    pub fn materialize(tables: &Tables) -> (Self, MaterializeStats) {
        let mut graph = Graph::default();
        let mut stats = MaterializeStats::default();
        let mut next_id: u64 = 0;

        let mut user_ids: HashMap<&str, u64> = HashMap::new();
        for user in &tables.users {
            if let Entry::Vacant(slot) = user_ids.entry(user.id.as_str()) {
                slot.insert(next_id);
                graph.nodes.push(Node {
                    id: next_id,
                    label: user.login.clone(),
                    kind: NodeKind::User,
                });
                next_id += 1;
                stats.users += 1;
            }
        }

        let mut repository_ids: HashMap<&str, u64> = HashMap::new();
        for repository in &tables.repositories {
            if let Entry::Vacant(slot) = repository_ids.entry(repository.id.as_str()) {
                slot.insert(next_id);
                graph.nodes.push(Node {
                    id: next_id,
                    label: repository.full_name.clone(),
                    kind: NodeKind::Repository,
                });
                next_id += 1;
                stats.repositories += 1;
            }
        }

        for contribution in &tables.contributions {
            let source = user_ids.get(contribution.user_id.as_str());
            let target = repository_ids.get(contribution.repository_id.as_str());
            let (Some(&source), Some(&target)) = (source, target) else {
                tracing::warn!(
                    user = %contribution.user_id,
                    repository = %contribution.repository_id,
                    "Skipping contribution with unknown endpoint"
                );
                stats.dangling += 1;
                continue;
            };
            graph.edges.push(Edge {
                source,
                target,
                weight: contribution.count,
            });
        }
        stats.edges = graph.edges.len();

        (graph, stats)
    }

    pub fn node(&self, id: u64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Write `nodes` and `edges` CSVs, replacing existing files. On error
    /// both previous files are left as they were.
    pub fn write(&self, nodes: &Path, edges: &Path) -> Result<(), StoreError> {
        let mut files = StagedFiles::new();
        files.csv(nodes, &NODE_HEADER, &self.nodes)?;
        files.csv(edges, &EDGE_HEADER, &self.edges)?;
        files.commit()
    }

    /// Write `nodes.csv` and `edges.csv` into `dir`.
    pub fn write_dir(&self, dir: &Path) -> Result<(), StoreError> {
        self.write(&dir.join(NODES_FILE), &dir.join(EDGES_FILE))
    }

    pub fn read(nodes: &Path, edges: &Path) -> Result<Self, StoreError> {
        require(nodes, steps::GRAPH)?;
        require(edges, steps::GRAPH)?;
        Ok(Self {
            nodes: read_csv(nodes)?,
            edges: read_csv(edges)?,
        })
    }
}

fn read_csv<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| StoreError::csv(path, e))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| StoreError::csv(path, e)))
        .collect()
}

/// Where a materialized graph was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphOutput {
    pub directory: PathBuf,
    pub stats: MaterializeStats,
}

/// Materialize the REST tables into `rest/gephi/`.
pub fn write_rest_graph(results: &ResultsDir) -> Result<GraphOutput, StoreError> {
    let tables = Tables::load_rest(results)?;
    write_graph(&tables, results.rest_gephi())
}

/// Materialize the GraphQL tables into `graphql/gephi/`.
pub fn write_graphql_graph(results: &ResultsDir) -> Result<GraphOutput, StoreError> {
    let tables = Tables::load_graphql(results)?;
    write_graph(&tables, results.graphql_gephi())
}

fn write_graph(tables: &Tables, directory: PathBuf) -> Result<GraphOutput, StoreError> {
    let (graph, stats) = Graph::materialize(tables);
    graph.write_dir(&directory)?;
    tracing::info!(
        users = stats.users,
        repositories = stats.repositories,
        edges = stats.edges,
        dangling = stats.dangling,
        directory = %directory.display(),
        "Wrote graph"
    );
    Ok(GraphOutput { directory, stats })
}
