//! Configuration file support for repograph.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `REPOGRAPH_`, e.g., `REPOGRAPH_GITHUB_TOKEN`)
//! 3. Config file (./repograph.toml, then ~/.config/repograph/config.toml)
//! 4. Built-in defaults
//!
//! Environment variables use `_` as the section separator, so only
//! single-word keys (`github.login`, `github.token`) can be set that way.
//! Multi-word keys belong in a config file or on the command line.
//!
//! Example config file:
//! ```toml
//! [github]
//! login = "octocat"
//! token = "ghp_..."  # or use REPOGRAPH_GITHUB_TOKEN env var
//!
//! [fetch]
//! results_dir = "results"
//! quota_threshold = 100
//! backoff_secs = 60
//! requests_per_second = 10   # optional pacing
//! users_per_query = 20
//! repositories_per_user = 20
//! contributors_per_repository = 30
//! max_consecutive_failures = 50  # optional, unbounded by default
//! on_rate_limit_error = "assume-remaining"  # or "abort"
//!
//! [clean]
//! min_repositories_per_user = 10
//! min_contributors_per_repository = 10
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use repograph::clean::{DEFAULT_MIN_CONTRIBUTORS_PER_REPOSITORY, DEFAULT_MIN_REPOSITORIES_PER_USER};
use repograph::fetch::{DEFAULT_CONTRIBUTORS_PER_REPOSITORY, DEFAULT_RETRY_DELAY};
use repograph::github::{DEFAULT_REPOSITORIES_PER_USER, DEFAULT_USER_SEARCH, DEFAULT_USERS_PER_QUERY};
use repograph::rate_limit::{DEFAULT_BACKOFF_INTERVAL, DEFAULT_QUOTA_THRESHOLD};
use repograph::{DegreeThresholds, GatePolicy, RateLimitErrorPolicy};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub fetch: FetchConfig,
    pub clean: CleanConfig,
}

/// GitHub credentials and endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Account used for basic authentication.
    /// Can also be set via REPOGRAPH_GITHUB_LOGIN environment variable.
    pub login: Option<String>,
    /// Personal access token.
    /// Can also be set via REPOGRAPH_GITHUB_TOKEN environment variable.
    pub token: Option<String>,
    /// REST base URL (GitHub Enterprise or a test server).
    pub api_url: Option<String>,
    pub graphql_url: Option<String>,
}

/// Defaults for fetch commands.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Root of the results tree.
    pub results_dir: PathBuf,
    /// Back off while the remaining quota is at or below this.
    pub quota_threshold: usize,
    pub backoff_secs: u64,
    /// Pause before retrying a failed page.
    pub retry_delay_secs: u64,
    /// Optional proactive pacing of outgoing requests.
    pub requests_per_second: Option<u32>,
    pub users_per_query: u32,
    pub repositories_per_user: u32,
    pub contributors_per_repository: u32,
    /// GraphQL user search string.
    pub search: String,
    /// Unbounded when unset.
    pub max_consecutive_failures: Option<u32>,
    pub on_rate_limit_error: RateLimitErrorPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            quota_threshold: DEFAULT_QUOTA_THRESHOLD,
            backoff_secs: DEFAULT_BACKOFF_INTERVAL.as_secs(),
            retry_delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
            requests_per_second: None,
            users_per_query: DEFAULT_USERS_PER_QUERY,
            repositories_per_user: DEFAULT_REPOSITORIES_PER_USER,
            contributors_per_repository: DEFAULT_CONTRIBUTORS_PER_REPOSITORY,
            search: DEFAULT_USER_SEARCH.to_string(),
            max_consecutive_failures: None,
            on_rate_limit_error: RateLimitErrorPolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            threshold: self.quota_threshold,
            interval: Duration::from_secs(self.backoff_secs),
            on_query_error: self.on_rate_limit_error,
        }
    }
}

/// Default degree thresholds for `repograph clean`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    pub min_repositories_per_user: usize,
    pub min_contributors_per_repository: usize,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            min_repositories_per_user: DEFAULT_MIN_REPOSITORIES_PER_USER,
            min_contributors_per_repository: DEFAULT_MIN_CONTRIBUTORS_PER_REPOSITORY,
        }
    }
}

impl CleanConfig {
    pub fn thresholds(&self) -> DegreeThresholds {
        DegreeThresholds {
            min_repositories_per_user: self.min_repositories_per_user,
            min_contributors_per_repository: self.min_contributors_per_repository,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/repograph/config.toml)
    /// 3. Local config file (./repograph.toml)
    /// 4. Environment variables with REPOGRAPH_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("repograph.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./repograph.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., REPOGRAPH_GITHUB_TOKEN -> github.token
        builder = builder.add_source(
            Environment::with_prefix("REPOGRAPH")
                .separator("_")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repograph").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Login and token, or an error naming where to set them.
    pub fn credentials(&self) -> Result<(String, String), String> {
        let login = self.github.login.clone().filter(|s| !s.is_empty());
        let token = self.github.token.clone().filter(|s| !s.is_empty());
        match (login, token) {
            (Some(login), Some(token)) => Ok((login, token)),
            (login, token) => {
                let mut missing = Vec::new();
                if login.is_none() {
                    missing.push("login (REPOGRAPH_GITHUB_LOGIN)");
                }
                if token.is_none() {
                    missing.push("token (REPOGRAPH_GITHUB_TOKEN)");
                }
                Err(format!(
                    "Missing GitHub {}. Set them in the [github] section of repograph.toml \
                     or in the environment.",
                    missing.join(" and ")
                ))
            }
        }
    }
}
