//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when talking to the GitHub REST or GraphQL API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("authentication failed (HTTP 401); check your GitHub login and token")]
    AuthFailed,

    #[error("rate limit exceeded (HTTP {status})")]
    RateLimited {
        status: u16,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unavailable for legal reasons: {0}")]
    Unavailable(String),

    #[error("unexpected HTTP status {status} from {route}")]
    Status { status: u16, route: String },

    #[error("failed to decode response from {route}: {source}")]
    Decode {
        route: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("GraphQL request failed: {0}")]
    GraphQl(String),

    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GitHubError {
    /// Whether retrying the request can never succeed.
    #[inline]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed)
    }

    /// Whether the run must stop: retrying cannot change the outcome.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthFailed | Self::InvalidUrl(_))
    }

    /// Whether the request may succeed on a later attempt.
    #[inline]
    pub fn is_transient(&self) -> bool {
        !self.is_fatal()
    }

    /// Whether the target resource is permanently gone (deleted or blocked).
    #[inline]
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_auth_failures_are_fatal() {
        assert!(GitHubError::AuthFailed.is_auth_failure());
        assert!(!GitHubError::AuthFailed.is_transient());

        let server = GitHubError::Status {
            status: 502,
            route: "/repositories".to_string(),
        };
        assert!(server.is_transient());

        let limited = GitHubError::RateLimited {
            status: 403,
            reset_at: None,
        };
        assert!(limited.is_transient());
        assert!(GitHubError::Http(HttpError::Transport("reset".into())).is_transient());
    }

    #[test]
    fn invalid_url_is_fatal() {
        let err = GitHubError::from(url::Url::parse("not a url").unwrap_err());
        assert!(err.is_fatal());
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn gone_covers_not_found_and_legal_blocks() {
        assert!(GitHubError::NotFound("a/b".into()).is_gone());
        assert!(GitHubError::Unavailable("a/b".into()).is_gone());
        assert!(!GitHubError::GraphQl("boom".into()).is_gone());
    }

    #[test]
    fn auth_message_is_actionable() {
        assert!(GitHubError::AuthFailed.to_string().contains("token"));
    }
}
