//! GitHub API access for the crawler.
//!
//! # Module Structure
//!
//! - [`client`] - Authenticated client for the REST and GraphQL endpoints
//! - [`error`] - Error types and their fatal/transient classification
//! - [`query`] - The user/contribution search query
//! - [`types`] - Wire types for responses

mod client;
mod error;
mod query;
mod types;

pub use client::{
    ClientConfig, DEFAULT_API_URL, DEFAULT_GRAPHQL_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
    GitHubClient,
};
pub use error::{GitHubError, Result};
pub use query::{
    ContributionsQuery, ContributionsVariables, DEFAULT_REPOSITORIES_PER_USER,
    DEFAULT_USER_SEARCH, DEFAULT_USERS_PER_QUERY, MAX_PAGE_SIZE,
};
pub use types::{
    ContributedRepositories, Contributor, GraphQlRateLimit, Language, PageInfo,
    RateLimitResource, RateLimitResources, RateLimitResponse, RepositoryNode, RepositorySummary,
    SearchEdge, StarCount, UserNode, UserSearchPage,
};
