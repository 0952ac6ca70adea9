//! Resumable fetch runs against the REST and GraphQL APIs.
//!
//! # Module Structure
//!
//! - [`engine`] - The pagination loop: `Fetcher`, `PageSource`, `RecordSink`
//! - [`progress`] - Progress events: `FetchProgress`, `ProgressCallback`, `emit()`
//! - [`rest`] - Repository listing and contributor walk
//! - [`graphql`] - User search with nested contributed repositories
//!
//! # Example
//!
//! ```ignore
//! use repograph::fetch::{FetchOptions, fetch_repositories};
//! use repograph::github::{ClientConfig, GitHubClient};
//! use repograph::store::ResultsDir;
//!
//! let client = GitHubClient::new(ClientConfig::new(login, token))?;
//! let results = ResultsDir::new("results");
//! let options = FetchOptions { target: Some(1000), ..Default::default() };
//! let summary = fetch_repositories(&client, &results, &options, None, None).await?;
//! println!("{} repositories, resume at {:?}", summary.fetched, summary.last_cursor);
//! ```

pub mod engine;
pub mod graphql;
pub mod progress;
pub mod rest;
mod types;

pub use engine::{Fetcher, Page, PageItem, PageOutcome, PageSource, RecordSink};
pub use graphql::{UserFetchReport, UserSearch, fetch_user_nodes};
pub use progress::{FetchProgress, ProgressCallback, emit};
pub use rest::{
    ContributionSink, ContributorRecord, ContributorSource, DEFAULT_CONTRIBUTORS_PER_REPOSITORY,
    RepositoryListing, RepositorySink, fetch_contributors, fetch_repositories,
};
pub use types::{
    CursorPolicy, DEFAULT_RETRY_DELAY, FetchError, FetchOptions, FetchSummary, StopReason,
};
