//! Options, results and errors for fetch runs.

use std::time::Duration;

use thiserror::Error;

use crate::github::GitHubError;
use crate::rate_limit::GatePolicy;
use crate::store::StoreError;

/// Pause before retrying a page after a transient failure.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// When cursors are written to the checkpoint log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPolicy {
    /// After every record that carries its own cursor, then the page cursor.
    #[default]
    PerRecord,
    /// Once per page, after all of its records.
    PerPage,
}

/// Options for a single fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Stop once at least this many records were counted. `None` runs until
    /// the API reports no more records.
    pub target: Option<usize>,
    pub cursor_policy: CursorPolicy,
    /// End the run after this many consecutive transient failures.
    /// `None` retries indefinitely.
    pub max_consecutive_failures: Option<u32>,
    pub retry_delay: Duration,
    pub gate: GatePolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            target: None,
            cursor_policy: CursorPolicy::default(),
            max_consecutive_failures: None,
            retry_delay: DEFAULT_RETRY_DELAY,
            gate: GatePolicy::default(),
        }
    }
}

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The target record count was reached (possibly overshot by one page).
    TargetReached,
    /// The API returned an empty page: everything has been fetched.
    Exhausted,
    /// A page yielded no cursor, so there is no position to continue from.
    NoCursor,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::TargetReached => "target reached",
            StopReason::Exhausted => "no more records",
            StopReason::NoCursor => "page had no cursor",
        }
    }
}

/// Outcome of a completed fetch run.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSummary<C> {
    /// Records counted toward the target during this run.
    pub fetched: usize,
    /// Pages appended during this run.
    pub pages: usize,
    /// Transient failures encountered (and retried).
    pub failures: u32,
    /// Cursor the next run will resume from.
    pub last_cursor: Option<C>,
    pub stop: StopReason,
}

/// Errors that end a fetch run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("authentication failed (HTTP 401); check your GitHub login and token")]
    AuthFailed,

    #[error("giving up after {failures} consecutive failed requests")]
    TooManyFailures {
        failures: u32,
        #[source]
        last_error: GitHubError,
    },

    #[error(transparent)]
    GitHub(GitHubError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GitHubError> for FetchError {
    fn from(err: GitHubError) -> Self {
        if err.is_auth_failure() {
            FetchError::AuthFailed
        } else {
            FetchError::GitHub(err)
        }
    }
}

impl FetchError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, FetchError::AuthFailed)
    }
}
