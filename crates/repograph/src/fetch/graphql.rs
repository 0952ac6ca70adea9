//! GraphQL fetch: users and the repositories they contributed to.

use async_trait::async_trait;
use serde_json::Value;

use super::engine::{Fetcher, Page, PageItem, PageOutcome, PageSource, RecordSink};
use super::progress::ProgressCallback;
use super::types::{FetchError, FetchOptions, FetchSummary};
use crate::checkpoint::{CheckpointStore, PageCursor};
use crate::github::{ContributionsQuery, GitHubClient, GitHubError};
use crate::rate_limit::{QuotaResource, RateLimitGate};
use crate::store::{JsonLinesLog, ResultsDir, StoreError};

/// Pages of the user search, each edge carrying its own cursor.
pub struct UserSearch {
    client: GitHubClient,
    query: ContributionsQuery,
}

impl UserSearch {
    pub fn new(client: GitHubClient, query: ContributionsQuery) -> Self {
        Self { client, query }
    }
}

#[async_trait]
impl PageSource for UserSearch {
    type Record = Value;
    type Cursor = PageCursor;

    fn name(&self) -> &'static str {
        "graphql-users"
    }

    async fn next_page(
        &mut self,
        after: Option<&PageCursor>,
    ) -> Result<PageOutcome<Value, PageCursor>, GitHubError> {
        let query = self.query.clone().after(after.map(PageCursor::as_str));
        let page = self.client.search_users(&query).await?;
        if page.edges.is_empty() {
            return Ok(PageOutcome::Exhausted);
        }

        Ok(PageOutcome::Page(Page {
            counted: page.edges.len(),
            items: page
                .edges
                .into_iter()
                .map(|edge| PageItem {
                    record: edge.node,
                    cursor: edge.cursor.map(PageCursor),
                })
                .collect(),
            end_cursor: page.end_cursor.map(PageCursor),
            rate_remaining: page.remaining,
        }))
    }
}

impl RecordSink<Value> for JsonLinesLog {
    fn append(&mut self, records: &[Value]) -> Result<(), StoreError> {
        JsonLinesLog::append(self, records)
    }
}

/// Result of a GraphQL fetch run.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFetchReport {
    pub summary: FetchSummary<PageCursor>,
    /// Records in the refreshed `data.json` snapshot.
    pub snapshot_records: usize,
}

/// Start or resume the user search into `graphql/graphql_data.txt`, then
/// refresh the `graphql/data.json` snapshot.
///
/// `after` overrides the recorded checkpoint.
pub async fn fetch_user_nodes(
    client: &GitHubClient,
    results: &ResultsDir,
    options: &FetchOptions,
    query: ContributionsQuery,
    after: Option<String>,
    on_progress: Option<&ProgressCallback>,
) -> Result<UserFetchReport, FetchError> {
    let log = JsonLinesLog::new(results.graphql_raw());
    let gate = RateLimitGate::new(client.clone(), QuotaResource::Graphql, options.gate.clone());

    let summary = Fetcher::new(
        UserSearch::new(client.clone(), query),
        log.clone(),
        CheckpointStore::new(results.graphql_cursors()),
        gate,
    )
    .options(options.clone())
    .progress(on_progress)
    .run(after.map(PageCursor))
    .await?;

    let snapshot_records = if log.path().exists() {
        let count = log.write_snapshot(&results.graphql_snapshot())?;
        tracing::info!(
            records = count,
            path = %results.graphql_snapshot().display(),
            "Wrote JSON snapshot"
        );
        count
    } else {
        0
    };

    Ok(UserFetchReport {
        summary,
        snapshot_records,
    })
}
