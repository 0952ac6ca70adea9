//! Typed builder for the user/contribution search query.
//!
//! The query document is fixed; everything that varies between requests
//! (page size, nested repository count, search string, cursor) travels as a
//! GraphQL variable, so the wire payload is produced in exactly one place.

use serde::Serialize;
use serde_json::json;

/// GitHub caps `first` arguments at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

pub const DEFAULT_USERS_PER_QUERY: u32 = 20;
pub const DEFAULT_REPOSITORIES_PER_USER: u32 = 20;
pub const DEFAULT_USER_SEARCH: &str = "type:user";

const CONTRIBUTIONS_QUERY: &str = r#"
query listContributions($search: String!, $first: Int!, $after: String, $repositories: Int!) {
  rateLimit {
    cost
    remaining
    resetAt
  }
  search(query: $search, type: USER, first: $first, after: $after) {
    pageInfo {
      endCursor
      hasNextPage
    }
    edges {
      cursor
      node {
        ... on User {
          id
          login
          name
          repositoriesContributedTo(
            includeUserRepositories: true,
            first: $repositories,
            orderBy: { direction: DESC, field: STARGAZERS }
          ) {
            totalCount
            nodes {
              id
              name
              nameWithOwner
              stargazers { totalCount }
              primaryLanguage { name }
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionsVariables {
    pub search: String,
    pub first: u32,
    pub after: Option<String>,
    pub repositories: u32,
}

/// A page request for users and the repositories they contributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionsQuery {
    search: String,
    users_per_page: u32,
    repositories_per_user: u32,
    after: Option<String>,
}

impl Default for ContributionsQuery {
    fn default() -> Self {
        Self {
            search: DEFAULT_USER_SEARCH.to_string(),
            users_per_page: DEFAULT_USERS_PER_QUERY,
            repositories_per_user: DEFAULT_REPOSITORIES_PER_USER,
            after: None,
        }
    }
}

impl ContributionsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users per page, clamped to `1..=100`.
    #[must_use]
    pub fn users_per_page(mut self, count: u32) -> Self {
        self.users_per_page = count.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Contributed repositories selected per user, clamped to `1..=100`.
    #[must_use]
    pub fn repositories_per_user(mut self, count: u32) -> Self {
        self.repositories_per_user = count.clamp(1, MAX_PAGE_SIZE);
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Continue strictly after `cursor`.
    #[must_use]
    pub fn after(mut self, cursor: Option<&str>) -> Self {
        self.after = cursor.map(str::to_string);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.users_per_page
    }

    pub fn document(&self) -> &'static str {
        CONTRIBUTIONS_QUERY
    }

    pub fn variables(&self) -> ContributionsVariables {
        ContributionsVariables {
            search: self.search.clone(),
            first: self.users_per_page,
            after: self.after.clone(),
            repositories: self.repositories_per_user,
        }
    }

    /// The JSON request body sent to the GraphQL endpoint.
    pub fn to_body(&self) -> serde_json::Value {
        json!({
            "query": self.document(),
            "variables": self.variables(),
        })
    }
}
