//! REST fetches: the public repository listing and the per-repository
//! contributor walk.

use std::collections::HashSet;

use async_trait::async_trait;

use super::engine::{Fetcher, Page, PageItem, PageOutcome, PageSource, RecordSink};
use super::progress::ProgressCallback;
use super::types::{FetchError, FetchOptions, FetchSummary};
use crate::checkpoint::{CheckpointStore, RepositoryId};
use crate::github::{Contributor, GitHubClient, GitHubError, RepositorySummary};
use crate::rate_limit::{QuotaResource, RateLimitGate};
use crate::store::{CsvLog, ResultsDir, StoreError, require, steps};

/// Default (and GitHub's) page size for the contributor listing.
pub const DEFAULT_CONTRIBUTORS_PER_REPOSITORY: u32 = 30;

/// Pages of `GET /repositories?since=<id>`.
pub struct RepositoryListing {
    client: GitHubClient,
}

impl RepositoryListing {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for RepositoryListing {
    type Record = RepositorySummary;
    type Cursor = RepositoryId;

    fn name(&self) -> &'static str {
        "rest-repositories"
    }

    async fn next_page(
        &mut self,
        after: Option<&RepositoryId>,
    ) -> Result<PageOutcome<RepositorySummary, RepositoryId>, GitHubError> {
        let since = after.map_or(0, |c| c.0);
        let repositories = self.client.list_repositories(since).await?;
        if repositories.is_empty() {
            return Ok(PageOutcome::Exhausted);
        }

        let end_cursor = repositories.iter().map(|r| r.id).max().map(RepositoryId);
        Ok(PageOutcome::Page(Page {
            counted: repositories.len(),
            end_cursor,
            items: repositories
                .into_iter()
                .map(|record| PageItem {
                    record,
                    cursor: None,
                })
                .collect(),
            rate_remaining: None,
        }))
    }
}

/// Writes listed repositories to `rest/repositories.csv`.
pub struct RepositorySink {
    log: CsvLog,
}

impl RepositorySink {
    pub fn new(log: CsvLog) -> Self {
        Self { log }
    }
}

impl RecordSink<RepositorySummary> for RepositorySink {
    fn append(&mut self, records: &[RepositorySummary]) -> Result<(), StoreError> {
        let rows: Vec<(u64, &str)> = records
            .iter()
            .map(|r| (r.id, r.full_name.as_str()))
            .collect();
        self.log.append(&rows)
    }
}

/// One contributor of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorRecord {
    pub repository_id: u64,
    pub contributor: Contributor,
}

/// Walks the listed repositories in file order, one repository per page.
pub struct ContributorSource {
    client: GitHubClient,
    repositories: Vec<(u64, String)>,
    /// Index of the first repository not yet processed in this run.
    next: usize,
    per_page: u32,
}

impl ContributorSource {
    /// Load the repository list written by the listing fetch.
    pub fn open(client: GitHubClient, results: &ResultsDir, per_page: u32) -> Result<Self, StoreError> {
        let path = results.rest_repositories();
        require(&path, steps::REST_REPOSITORIES)?;

        let mut repositories = Vec::new();
        for record in CsvLog::new(&path).read_records()? {
            let (Some(id), Some(name)) = (record.get(0), record.get(1)) else {
                continue;
            };
            match id.parse::<u64>() {
                Ok(id) => repositories.push((id, name.to_string())),
                Err(_) => tracing::warn!(line = ?record, "Skipping malformed repository row"),
            }
        }

        Ok(Self::from_repositories(client, repositories, per_page))
    }

    /// Repositories are walked in ascending id order, once each. A listing
    /// rerun with an earlier `--since` appends lower or repeated ids after
    /// higher ones, and the per-repository cursor must never pass over them.
    pub fn from_repositories(
        client: GitHubClient,
        mut repositories: Vec<(u64, String)>,
        per_page: u32,
    ) -> Self {
        repositories.sort_by_key(|(id, _)| *id);
        repositories.dedup_by_key(|(id, _)| *id);
        Self {
            client,
            repositories,
            next: 0,
            per_page,
        }
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

#[async_trait]
impl PageSource for ContributorSource {
    type Record = ContributorRecord;
    type Cursor = RepositoryId;

    fn name(&self) -> &'static str {
        "rest-contributors"
    }

    async fn next_page(
        &mut self,
        after: Option<&RepositoryId>,
    ) -> Result<PageOutcome<ContributorRecord, RepositoryId>, GitHubError> {
        let floor = after.map(|c| c.0);
        let Some(offset) = self.repositories[self.next..]
            .iter()
            .position(|(id, _)| floor.is_none_or(|f| *id > f))
        else {
            self.next = self.repositories.len();
            return Ok(PageOutcome::Exhausted);
        };
        let index = self.next + offset;
        let (repository_id, full_name) = &self.repositories[index];
        let repository_id = *repository_id;

        let contributors = match self.client.list_contributors(full_name, self.per_page).await {
            Ok(contributors) => contributors,
            Err(e) if e.is_gone() => {
                tracing::warn!(repository = %full_name, error = %e, "Skipping repository");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        self.next = index + 1;

        Ok(PageOutcome::Page(Page {
            items: contributors
                .into_iter()
                .map(|contributor| PageItem {
                    record: ContributorRecord {
                        repository_id,
                        contributor,
                    },
                    cursor: None,
                })
                .collect(),
            end_cursor: Some(RepositoryId(repository_id)),
            counted: 1,
            rate_remaining: None,
        }))
    }
}

/// Writes contributions and first-seen users under `rest/`.
pub struct ContributionSink {
    contributions: CsvLog,
    users: CsvLog,
    known_users: HashSet<u64>,
}

impl ContributionSink {
    /// Open the sink, loading users already written by earlier runs.
    pub fn open(results: &ResultsDir) -> Result<Self, StoreError> {
        let users = CsvLog::new(results.rest_users());
        let mut known_users = HashSet::new();
        if users.exists() {
            for record in users.read_records()? {
                if let Some(id) = record.get(0).and_then(|id| id.parse().ok()) {
                    known_users.insert(id);
                }
            }
        }

        Ok(Self {
            contributions: CsvLog::new(results.rest_contributions()),
            users,
            known_users,
        })
    }

    pub fn known_users(&self) -> usize {
        self.known_users.len()
    }
}

impl RecordSink<ContributorRecord> for ContributionSink {
    fn append(&mut self, records: &[ContributorRecord]) -> Result<(), StoreError> {
        let mut new_users = Vec::new();
        let mut contributions = Vec::with_capacity(records.len());
        for record in records {
            let user = &record.contributor;
            if self.known_users.insert(user.id) {
                new_users.push((user.id, user.login.as_str()));
            }
            contributions.push((record.repository_id, user.id, user.contributions));
        }

        self.users.append(&new_users)?;
        self.contributions.append(&contributions)
    }
}

/// Start or resume listing public repositories into `rest/repositories.csv`.
///
/// `since` overrides the recorded checkpoint.
pub async fn fetch_repositories(
    client: &GitHubClient,
    results: &ResultsDir,
    options: &FetchOptions,
    since: Option<u64>,
    on_progress: Option<&ProgressCallback>,
) -> Result<FetchSummary<RepositoryId>, FetchError> {
    let gate = RateLimitGate::new(client.clone(), QuotaResource::Core, options.gate.clone());
    Fetcher::new(
        RepositoryListing::new(client.clone()),
        RepositorySink::new(CsvLog::new(results.rest_repositories())),
        CheckpointStore::new(results.rest_repositories_cursor()),
        gate,
    )
    .options(options.clone())
    .progress(on_progress)
    .run(since.map(RepositoryId))
    .await
}

/// Start or resume fetching contributors for every listed repository.
///
/// The target in `options` counts repositories processed.
pub async fn fetch_contributors(
    client: &GitHubClient,
    results: &ResultsDir,
    options: &FetchOptions,
    per_page: u32,
    since: Option<u64>,
    on_progress: Option<&ProgressCallback>,
) -> Result<FetchSummary<RepositoryId>, FetchError> {
    let source = ContributorSource::open(client.clone(), results, per_page)?;
    let sink = ContributionSink::open(results)?;
    tracing::info!(
        repositories = source.len(),
        known_users = sink.known_users(),
        "Loaded contributor fetch state"
    );

    let gate = RateLimitGate::new(client.clone(), QuotaResource::Core, options.gate.clone());
    Fetcher::new(
        source,
        sink,
        CheckpointStore::new(results.rest_contributors_cursor()),
        gate,
    )
    .options(options.clone())
    .progress(on_progress)
    .run(since.map(RepositoryId))
    .await
}
