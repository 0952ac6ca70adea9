use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use repograph::fetch::{CursorPolicy, FetchError, FetchOptions, FetchSummary};
use repograph::graph::GraphOutput;
use repograph::{ApiRateLimiter, ClientConfig, Cursor, GitHubClient, ResultsDir};

use crate::CommonFetchOptions;
use crate::config::Config;
use crate::lock::ResultsLock;
use crate::progress::ProgressReporter;

/// Build an authenticated client from config, with optional request pacing.
pub(crate) fn build_client(
    config: &Config,
    requests_per_second: Option<u32>,
) -> Result<GitHubClient, Box<dyn Error>> {
    let (login, token) = config.credentials()?;
    let mut client_config = ClientConfig::new(login, token);
    if let Some(url) = &config.github.api_url {
        client_config = client_config.with_api_url(url.as_str());
    }
    if let Some(url) = &config.github.graphql_url {
        client_config = client_config.with_graphql_url(url.as_str());
    }

    let mut client = GitHubClient::new(client_config)?;
    if let Some(rps) = requests_per_second.or(config.fetch.requests_per_second) {
        tracing::debug!(requests_per_second = rps, "Pacing requests");
        client = client.with_pacer(ApiRateLimiter::new(rps));
    }
    Ok(client)
}

/// Merge config defaults with command-line overrides.
pub(crate) fn fetch_options(
    config: &Config,
    opts: &CommonFetchOptions,
    cursor_policy: CursorPolicy,
) -> FetchOptions {
    let mut gate = config.fetch.gate_policy();
    if let Some(threshold) = opts.quota_threshold {
        gate.threshold = threshold;
    }
    FetchOptions {
        target: opts.limit,
        cursor_policy,
        max_consecutive_failures: opts.max_failures.or(config.fetch.max_consecutive_failures),
        retry_delay: Duration::from_secs(config.fetch.retry_delay_secs),
        gate,
    }
}

/// State every fetch command holds for the length of a run.
pub(crate) struct FetchContext {
    pub(crate) client: GitHubClient,
    pub(crate) results: ResultsDir,
    pub(crate) options: FetchOptions,
    pub(crate) reporter: Arc<ProgressReporter>,
    _lock: ResultsLock,
}

impl FetchContext {
    pub(crate) fn open(
        config: &Config,
        opts: &CommonFetchOptions,
        cursor_policy: CursorPolicy,
    ) -> Result<Self, Box<dyn Error>> {
        let client = build_client(config, opts.requests_per_second)?;
        let lock = ResultsLock::acquire(&config.fetch.results_dir)?;
        Ok(Self {
            client,
            results: ResultsDir::new(&config.fetch.results_dir),
            options: fetch_options(config, opts, cursor_policy),
            reporter: Arc::new(ProgressReporter::new()),
            _lock: lock,
        })
    }
}

/// Turn a failed run into an actionable message.
pub(crate) fn fetch_failed(err: FetchError) -> Box<dyn Error> {
    match err {
        FetchError::AuthFailed => "GitHub rejected the credentials (HTTP 401). Check your GitHub \
                                   login and token (REPOGRAPH_GITHUB_LOGIN / REPOGRAPH_GITHUB_TOKEN)."
            .into(),
        FetchError::Store(e) if e.is_missing_prerequisite() => e.to_string().into(),
        other => format!(
            "{other}. Everything up to the last recorded cursor is kept; \
             rerun the same command to resume."
        )
        .into(),
    }
}

pub(crate) fn print_summary<C: Cursor>(what: &str, summary: &FetchSummary<C>) {
    println!(
        "Fetched {} {} in {} pages ({}).",
        summary.fetched,
        what,
        summary.pages,
        summary.stop.as_str()
    );
    if summary.failures > 0 {
        println!("  {} failed requests were retried", summary.failures);
    }
    match &summary.last_cursor {
        Some(cursor) => println!("  Next run resumes after: {}", cursor.encode()),
        None => println!("  No cursor recorded yet"),
    }
}

pub(crate) fn print_graph_output(output: &GraphOutput) {
    let stats = &output.stats;
    println!(
        "Wrote {} users, {} repositories and {} edges to {}",
        stats.users,
        stats.repositories,
        stats.edges,
        output.directory.display()
    );
    if stats.dangling > 0 {
        println!(
            "  Skipped {} contributions whose user or repository is missing",
            stats.dangling
        );
    }
}
