//! Progress reporting types for fetch runs.
//!
//! The fetch loop never prints; it emits [`FetchProgress`] events through an
//! optional callback, and the caller decides how to render them.

use std::time::Duration;

/// Progress events emitted during a fetch run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum FetchProgress {
    /// A run is starting.
    Started {
        /// Which fetch is running (e.g. "rest-repositories").
        source: String,
        /// Cursor the run resumes from, if any.
        cursor: Option<String>,
        /// Soft upper bound on counted records.
        target: Option<usize>,
    },

    /// Remaining quota reported by the Rate-Limit Gate.
    QuotaChecked {
        remaining: usize,
    },

    /// Quota is at or below the threshold; the run is sleeping.
    Backoff {
        remaining: usize,
        threshold: usize,
        wait: Duration,
    },

    /// A page was appended and its cursor recorded.
    PageAppended {
        /// Page number within this run (1-indexed).
        page: usize,
        /// Records appended from this page.
        count: usize,
        /// Running total toward the target.
        fetched: usize,
        /// Cursor now recorded as the resume point.
        cursor: Option<String>,
    },

    /// A page request failed with a transient error and will be retried.
    PageFailed {
        /// Consecutive failures so far.
        attempt: u32,
        error: String,
    },

    /// Non-fatal condition worth surfacing.
    Warning {
        message: String,
    },

    /// The run ended normally.
    Finished {
        fetched: usize,
        pages: usize,
        /// Human-readable stop reason.
        reason: String,
    },
}

/// Progress callback for fetch operations.
pub type ProgressCallback = Box<dyn Fn(FetchProgress) + Send + Sync>;

/// Emit a progress event if a callback is registered.
#[inline]
pub fn emit(callback: Option<&ProgressCallback>, event: FetchProgress) {
    if let Some(cb) = callback {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn emit_without_callback_is_a_no_op() {
        emit(None, FetchProgress::QuotaChecked { remaining: 1 });
    }

    #[test]
    fn emit_forwards_events() {
        let seen: Arc<Mutex<Vec<FetchProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&seen);
        let callback: ProgressCallback = Box::new(move |event| {
            capture.lock().unwrap().push(event);
        });

        emit(
            Some(&callback),
            FetchProgress::Warning {
                message: "careful".to_string(),
            },
        );

        let seen = seen.lock().unwrap();
        assert!(matches!(
            seen.as_slice(),
            [FetchProgress::Warning { message }] if message == "careful"
        ));
    }
}
