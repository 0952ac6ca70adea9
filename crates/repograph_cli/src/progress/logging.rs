use repograph::fetch::FetchProgress;

/// Logging reporter using tracing for structured output.
pub(crate) struct LoggingReporter;

impl LoggingReporter {
    pub(crate) fn handle(&self, event: FetchProgress) {
        match event {
            FetchProgress::Started {
                source,
                cursor,
                target,
            } => {
                tracing::info!(source = %source, cursor = ?cursor, target = ?target, "Starting fetch");
            }

            FetchProgress::QuotaChecked { remaining } => {
                tracing::debug!(remaining, "Quota checked");
            }

            FetchProgress::Backoff {
                remaining,
                threshold,
                wait,
            } => {
                tracing::info!(
                    remaining,
                    threshold,
                    wait_secs = wait.as_secs(),
                    "Quota low, backing off"
                );
            }

            FetchProgress::PageAppended {
                page,
                count,
                fetched,
                cursor,
            } => {
                tracing::debug!(page, count, fetched, cursor = ?cursor, "Appended page");
            }

            FetchProgress::PageFailed { attempt, error } => {
                tracing::warn!(attempt, error = %error, "Page request failed, retrying");
            }

            FetchProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            FetchProgress::Finished {
                fetched,
                pages,
                reason,
            } => {
                tracing::info!(fetched, pages, reason = %reason, "Fetch complete");
            }

            _ => {}
        }
    }
}
