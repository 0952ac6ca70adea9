//! Repograph - GitHub contributor graphs for Gephi.
//!
//! This library collects user/repository contribution data from GitHub's
//! REST and GraphQL APIs and turns it into a bipartite graph.
//!
//! # Pipeline
//!
//! 1. [`fetch`] - resumable, rate-limited pagination into append-only logs
//!    under a [`ResultsDir`]; progress is checkpointed after every page.
//! 2. [`tables`] - raw logs reconstituted as users, repositories and
//!    contributions.
//! 3. [`graph`] - dense renumbering into `nodes.csv` / `edges.csv`.
//! 4. [`clean`] - degree-threshold pruning.
//! 5. [`distribution`] - degree histograms.
//!
//! # Example
//!
//! ```ignore
//! use repograph::fetch::{FetchOptions, fetch_user_nodes};
//! use repograph::github::{ClientConfig, ContributionsQuery, GitHubClient};
//! use repograph::{ResultsDir, graph, tables};
//!
//! let client = GitHubClient::new(ClientConfig::new(login, token))?;
//! let results = ResultsDir::new("results");
//!
//! let options = FetchOptions { target: Some(500), ..Default::default() };
//! fetch_user_nodes(&client, &results, &options, ContributionsQuery::new(), None, None).await?;
//! tables::write_graphql_tables(&results)?;
//! graph::write_graphql_graph(&results)?;
//! ```

pub mod checkpoint;
pub mod clean;
pub mod distribution;
pub mod fetch;
pub mod github;
pub mod graph;
pub mod http;
pub mod rate_limit;
pub mod store;
pub mod tables;

pub use checkpoint::{CheckpointStore, Cursor, PageCursor, RepositoryId};
pub use clean::{CleanReport, DegreeThresholds, clean, clean_files};
pub use distribution::{DegreeDistribution, Histogram};
pub use fetch::{FetchError, FetchOptions, FetchProgress, FetchSummary, ProgressCallback};
pub use github::{ClientConfig, GitHubClient, GitHubError};
pub use graph::{Edge, Graph, Node, NodeKind};
pub use rate_limit::{ApiRateLimiter, GatePolicy, RateLimitErrorPolicy, RateLimitGate};
pub use store::{ResultsDir, StoreError};
pub use tables::Tables;
