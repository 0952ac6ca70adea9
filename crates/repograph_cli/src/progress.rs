//! Progress reporting for fetch runs.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): a spinner per run using indicatif
//! - Logging mode (non-TTY): structured logging using tracing

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use repograph::fetch::{FetchProgress, ProgressCallback};

pub(crate) use interactive::InteractiveReporter;
pub(crate) use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub(crate) enum ProgressReporter {
    /// Interactive progress display for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub(crate) fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter)
        }
    }

    pub(crate) fn handle(&self, event: FetchProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub(crate) fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| reporter.handle(event))
    }

    /// Finish the spinner (interactive mode only).
    pub(crate) fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Short form of a cursor for display. GraphQL cursors are long base64 blobs.
pub(crate) fn short_cursor(cursor: &str) -> String {
    const MAX: usize = 16;
    if cursor.chars().count() <= MAX {
        cursor.to_string()
    } else {
        let head: String = cursor.chars().take(MAX).collect();
        format!("{head}…")
    }
}
