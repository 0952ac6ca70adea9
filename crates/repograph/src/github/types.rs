//! GitHub API data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single rate limit resource entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResource {
    /// Maximum requests allowed per period.
    #[serde(default)]
    pub limit: usize,
    /// Requests used in current period.
    #[serde(default)]
    pub used: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// Unix timestamp when the rate limit resets.
    #[serde(default)]
    pub reset: u64,
}

impl RateLimitResource {
    /// Get the reset time as a DateTime.
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset as i64, 0).unwrap_or_else(Utc::now)
    }
}

/// Per-resource rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResources {
    /// Core API rate limit (non-search REST endpoints).
    pub core: RateLimitResource,
    /// Search API rate limit.
    #[serde(default)]
    pub search: Option<RateLimitResource>,
    /// GraphQL API rate limit.
    #[serde(default)]
    pub graphql: Option<RateLimitResource>,
}

/// Response of `GET /rate_limit`.
///
/// `rate` is the legacy top-level field and mirrors `resources.core`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResponse {
    pub rate: RateLimitResource,
    #[serde(default)]
    pub resources: Option<RateLimitResources>,
}

impl RateLimitResponse {
    /// The GraphQL resource, falling back to the core limits when absent.
    pub fn graphql(&self) -> &RateLimitResource {
        self.resources
            .as_ref()
            .and_then(|r| r.graphql.as_ref())
            .unwrap_or(&self.rate)
    }

    /// The core REST resource.
    pub fn core(&self) -> &RateLimitResource {
        self.resources.as_ref().map(|r| &r.core).unwrap_or(&self.rate)
    }
}

/// One entry of `GET /repositories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub id: u64,
    pub full_name: String,
}

/// One entry of `GET /repos/{full_name}/contributors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: u64,
    pub login: String,
    pub contributions: u64,
}

// ---------- GraphQL ----------

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlErrorMessage {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    pub rate_limit: Option<GraphQlRateLimit>,
    pub search: SearchConnection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRateLimit {
    #[serde(default)]
    pub cost: Option<u32>,
    pub remaining: usize,
    #[serde(default)]
    pub reset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<SearchEdge>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// A search edge; the node is kept as raw JSON so it can be logged verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEdge {
    pub node: serde_json::Value,
    pub cursor: Option<String>,
}

/// One page of the user search, as consumed by the fetch loop.
#[derive(Debug, Clone)]
pub struct UserSearchPage {
    /// `rateLimit.remaining` embedded in the response.
    pub remaining: Option<usize>,
    pub end_cursor: Option<String>,
    pub edges: Vec<SearchEdge>,
}

/// Typed view of a raw user node.
///
/// Every field is optional: search results for non-user accounts come back as
/// empty objects, and GitHub nulls out fields it cannot resolve.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserNode {
    pub id: Option<String>,
    pub login: Option<String>,
    pub name: Option<String>,
    pub repositories_contributed_to: Option<ContributedRepositories>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContributedRepositories {
    pub total_count: Option<u64>,
    pub nodes: Vec<Option<RepositoryNode>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositoryNode {
    pub id: Option<String>,
    pub name: Option<String>,
    pub name_with_owner: Option<String>,
    pub stargazers: Option<StarCount>,
    pub primary_language: Option<Language>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarCount {
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Language {
    pub name: Option<String>,
}
