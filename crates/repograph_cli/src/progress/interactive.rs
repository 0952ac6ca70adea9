use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use repograph::fetch::FetchProgress;

use super::short_cursor;

/// Interactive progress reporter using indicatif.
///
/// A run with a target gets a bar sized to the target; an open-ended run gets
/// a spinner with a counter. Back-off and retries are shown in the message.
pub(crate) struct InteractiveReporter {
    bar: Mutex<Option<ProgressBar>>,
    draw_target: fn() -> ProgressDrawTarget,
}

impl InteractiveReporter {
    pub(crate) fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            draw_target: ProgressDrawTarget::stderr,
        }
    }

    #[cfg(test)]
    pub(crate) fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            draw_target: ProgressDrawTarget::hidden,
        }
    }

    pub(crate) fn handle(&self, event: FetchProgress) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };

        match event {
            FetchProgress::Started {
                source,
                cursor,
                target,
            } => {
                let bar = match target {
                    Some(total) => {
                        let bar = ProgressBar::with_draw_target(
                            Some(total as u64),
                            (self.draw_target)(),
                        );
                        bar.set_style(Self::bar_style());
                        bar
                    }
                    None => {
                        let bar = ProgressBar::with_draw_target(None, (self.draw_target)());
                        bar.set_style(Self::counter_style());
                        bar
                    }
                };
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_prefix(format!("{source:20}"));
                bar.set_message(match cursor {
                    Some(cursor) => format!("resuming after {}", short_cursor(&cursor)),
                    None => "starting".to_string(),
                });
                *slot = Some(bar);
            }

            FetchProgress::QuotaChecked { remaining } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_message(format!("quota {remaining}"));
                }
            }

            FetchProgress::Backoff {
                remaining,
                threshold,
                wait,
            } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_style(Self::waiting_style());
                    bar.set_message(format!(
                        "quota {remaining} <= {threshold}, waiting {}s",
                        wait.as_secs()
                    ));
                }
            }

            FetchProgress::PageAppended {
                page,
                fetched,
                cursor,
                ..
            } => {
                if let Some(bar) = slot.as_ref() {
                    if bar.length().is_some() {
                        bar.set_style(Self::bar_style());
                    } else {
                        bar.set_style(Self::counter_style());
                    }
                    bar.set_position(fetched as u64);
                    let at = cursor.as_deref().map(short_cursor).unwrap_or_default();
                    bar.set_message(format!("page {page} {at}"));
                }
            }

            FetchProgress::PageFailed { attempt, error } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_message(format!("retry {attempt}: {error}"));
                }
            }

            FetchProgress::Warning { message } => match slot.as_ref() {
                Some(bar) => bar.println(format!("warning: {message}")),
                None => eprintln!("warning: {message}"),
            },

            FetchProgress::Finished {
                fetched,
                pages,
                reason,
            } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_position(fetched as u64);
                    bar.finish_with_message(format!("{fetched} in {pages} pages ({reason})"));
                }
            }

            _ => {}
        }
    }

    pub(crate) fn finish(&self) {
        if let Ok(slot) = self.bar.lock()
            && let Some(bar) = slot.as_ref()
            && !bar.is_finished()
        {
            bar.abandon();
        }
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> Option<u64> {
        self.bar.lock().ok()?.as_ref().map(ProgressBar::position)
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.bar
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(ProgressBar::is_finished))
            .unwrap_or(false)
    }

    fn style(template: &str) -> ProgressStyle {
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn counter_style() -> ProgressStyle {
        Self::style("{prefix:.bold.cyan} {spinner:.green} {pos:>6} {msg}")
    }

    fn waiting_style() -> ProgressStyle {
        Self::style("{prefix:.bold.cyan} {spinner:.yellow} {pos:>6} {msg}")
    }

    fn bar_style() -> ProgressStyle {
        Self::style("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>6}/{len:6} {msg}")
            .progress_chars("=> ")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
