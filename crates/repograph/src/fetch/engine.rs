//! The resumable, rate-limited pagination loop.
//!
//! One [`Fetcher`] drives every fetch in the crate. What differs between the
//! REST listing, the REST contributor walk and the GraphQL user search is
//! captured by a [`PageSource`] (how to request the page after a cursor) and
//! a [`RecordSink`] (where records go). The loop itself:
//!
//! ```text
//! IDLE ──► REQUESTING ──► APPENDING ──► REQUESTING ... ──► DONE
//!              │  ▲
//!              ▼  │
//!            BACKOFF        (transient failure: stay in REQUESTING)
//! ```
//!
//! Records are appended before the cursor that covers them, so a crash
//! between the two re-fetches at most one page and never skips one.

use async_trait::async_trait;

use super::progress::{FetchProgress, ProgressCallback, emit};
use super::types::{CursorPolicy, FetchError, FetchOptions, FetchSummary, StopReason};
use crate::checkpoint::{CheckpointStore, Cursor};
use crate::github::GitHubError;
use crate::rate_limit::RateLimitGate;
use crate::store::StoreError;

/// One record and, if the API provides one, the cursor positioned after it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageItem<R, C> {
    pub record: R,
    pub cursor: Option<C>,
}

/// A successfully decoded, non-empty page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R, C> {
    pub items: Vec<PageItem<R, C>>,
    /// Cursor positioned after the whole page.
    pub end_cursor: Option<C>,
    /// How much this page counts toward the run's target.
    pub counted: usize,
    /// Remaining quota reported inline by the response, if any.
    pub rate_remaining: Option<usize>,
}

impl<R, C: Clone> Page<R, C> {
    /// The cursor this page leaves the run at, if any.
    fn resume_cursor(&self) -> Option<C> {
        self.end_cursor
            .clone()
            .or_else(|| self.items.iter().rev().find_map(|i| i.cursor.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome<R, C> {
    Page(Page<R, C>),
    /// Nothing after the given cursor: the fetch is complete.
    Exhausted,
}

/// Something that can be paged through by cursor.
#[async_trait]
pub trait PageSource: Send {
    type Record: Send;
    type Cursor: Cursor;

    /// Short name used in logs and progress events.
    fn name(&self) -> &'static str;

    /// Request the page strictly after `after` (or the first page).
    async fn next_page(
        &mut self,
        after: Option<&Self::Cursor>,
    ) -> Result<PageOutcome<Self::Record, Self::Cursor>, GitHubError>;
}

/// Append-only destination for fetched records.
pub trait RecordSink<R>: Send {
    fn append(&mut self, records: &[R]) -> Result<(), StoreError>;
}

/// Ephemeral state of one run. Durable state lives in the sink and the
/// checkpoint log.
#[derive(Debug)]
struct FetchSession<C> {
    target: Option<usize>,
    fetched: usize,
    pages: usize,
    cursor: Option<C>,
    consecutive_failures: u32,
    total_failures: u32,
}

impl<C> FetchSession<C> {
    fn new(target: Option<usize>, cursor: Option<C>) -> Self {
        Self {
            target,
            fetched: 0,
            pages: 0,
            cursor,
            consecutive_failures: 0,
            total_failures: 0,
        }
    }

    fn target_reached(&self) -> bool {
        self.target.is_some_and(|t| self.fetched >= t)
    }
}

/// Drives a [`PageSource`] into a [`RecordSink`], checkpointing as it goes.
pub struct Fetcher<'a, S: PageSource, K> {
    source: S,
    sink: K,
    checkpoint: CheckpointStore<S::Cursor>,
    gate: RateLimitGate,
    options: FetchOptions,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a, S, K> Fetcher<'a, S, K>
where
    S: PageSource,
    K: RecordSink<S::Record>,
{
    pub fn new(
        source: S,
        sink: K,
        checkpoint: CheckpointStore<S::Cursor>,
        gate: RateLimitGate,
    ) -> Self {
        Self {
            source,
            sink,
            checkpoint,
            gate,
            options: FetchOptions::default(),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn progress(mut self, callback: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = callback;
        self
    }

    /// Run until the target is reached, the source is exhausted, or a fatal
    /// error occurs.
    ///
    /// `start` overrides the checkpoint; otherwise the run resumes from the
    /// last recorded cursor.
    pub async fn run(
        mut self,
        start: Option<S::Cursor>,
    ) -> Result<FetchSummary<S::Cursor>, FetchError> {
        let cursor = match start {
            Some(cursor) => Some(cursor),
            None => self.checkpoint.last_cursor()?,
        };
        let mut session = FetchSession::new(self.options.target, cursor);
        let source = self.source.name();

        tracing::info!(
            source,
            cursor = ?session.cursor.as_ref().map(Cursor::encode),
            target = ?session.target,
            "Starting fetch"
        );
        emit(
            self.on_progress,
            FetchProgress::Started {
                source: source.to_string(),
                cursor: session.cursor.as_ref().map(Cursor::encode),
                target: session.target,
            },
        );

        let stop = loop {
            if session.target_reached() {
                break StopReason::TargetReached;
            }

            self.gate.wait_for_quota(self.on_progress).await?;

            match self.source.next_page(session.cursor.as_ref()).await {
                Ok(PageOutcome::Exhausted) => break StopReason::Exhausted,
                Ok(PageOutcome::Page(page)) => {
                    session.consecutive_failures = 0;
                    self.gate.observe(page.rate_remaining);
                    if !self.append_page(&mut session, page)? {
                        break StopReason::NoCursor;
                    }
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(source, error = %e, "Fetch aborted");
                    return Err(e.into());
                }
                Err(e) => self.record_failure(&mut session, e).await?,
            }
        };

        tracing::info!(
            source,
            fetched = session.fetched,
            pages = session.pages,
            reason = stop.as_str(),
            "Fetch finished"
        );
        emit(
            self.on_progress,
            FetchProgress::Finished {
                fetched: session.fetched,
                pages: session.pages,
                reason: stop.as_str().to_string(),
            },
        );

        Ok(FetchSummary {
            fetched: session.fetched,
            pages: session.pages,
            failures: session.total_failures,
            last_cursor: session.cursor,
            stop,
        })
    }

    /// Write a page's records and cursors. Returns `false` when the page
    /// left nothing to resume from.
    fn append_page(
        &mut self,
        session: &mut FetchSession<S::Cursor>,
        page: Page<S::Record, S::Cursor>,
    ) -> Result<bool, FetchError> {
        let count = page.items.len();
        let counted = page.counted;
        let Some(resume) = page.resume_cursor() else {
            let records: Vec<S::Record> = page.items.into_iter().map(|i| i.record).collect();
            self.sink.append(&records)?;
            self.page_appended(session, count, counted);
            tracing::warn!(count, "Page carried no cursor; stopping");
            emit(
                self.on_progress,
                FetchProgress::Warning {
                    message: format!("page of {count} records carried no cursor"),
                },
            );
            return Ok(false);
        };

        match self.options.cursor_policy {
            CursorPolicy::PerPage => {
                let records: Vec<S::Record> = page.items.into_iter().map(|i| i.record).collect();
                self.sink.append(&records)?;
                self.checkpoint.append(&resume)?;
            }
            CursorPolicy::PerRecord => {
                let mut written: Option<S::Cursor> = None;
                let mut pending = Vec::new();
                for item in page.items {
                    pending.push(item.record);
                    if let Some(cursor) = item.cursor {
                        self.sink.append(&pending)?;
                        pending.clear();
                        self.checkpoint.append(&cursor)?;
                        written = Some(cursor);
                    }
                }
                if !pending.is_empty() {
                    self.sink.append(&pending)?;
                }
                if written.as_ref() != Some(&resume) {
                    self.checkpoint.append(&resume)?;
                }
            }
        }

        session.cursor = Some(resume);
        self.page_appended(session, count, counted);
        Ok(true)
    }

    /// Count a written page. A cursorless page reports the previous cursor.
    fn page_appended(&self, session: &mut FetchSession<S::Cursor>, count: usize, counted: usize) {
        session.fetched += counted;
        session.pages += 1;

        let cursor = session.cursor.as_ref().map(Cursor::encode);
        tracing::debug!(
            page = session.pages,
            count,
            fetched = session.fetched,
            cursor = ?cursor,
            "Page appended"
        );
        emit(
            self.on_progress,
            FetchProgress::PageAppended {
                page: session.pages,
                count,
                fetched: session.fetched,
                cursor,
            },
        );
    }

    async fn record_failure(
        &mut self,
        session: &mut FetchSession<S::Cursor>,
        error: GitHubError,
    ) -> Result<(), FetchError> {
        session.consecutive_failures += 1;
        session.total_failures += 1;

        tracing::warn!(
            source = self.source.name(),
            attempt = session.consecutive_failures,
            error = %error,
            "Page request failed; retrying"
        );
        emit(
            self.on_progress,
            FetchProgress::PageFailed {
                attempt: session.consecutive_failures,
                error: error.to_string(),
            },
        );

        if let Some(max) = self.options.max_consecutive_failures
            && session.consecutive_failures >= max
        {
            return Err(FetchError::TooManyFailures {
                failures: session.consecutive_failures,
                last_error: error,
            });
        }

        if !self.options.retry_delay.is_zero() {
            tokio::time::sleep(self.options.retry_delay).await;
        }
        Ok(())
    }
}
