//! Progress bar reporter for batch runs

use crate::batch::BatchSummary;
use crate::services::{ProgressReporter, ProgressUpdate};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Drives an `indicatif` progress bar from batch progress updates
#[derive(Clone)]
pub struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    /// Create a reporter drawing to stderr
    #[must_use]
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Create a reporter that draws nothing, for tests and non-interactive runs
    #[must_use]
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden()))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("#>-"));
        bar.set_style(style);
        Self { bar }
    }

    /// Current position of the bar
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    #[must_use]
    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl Default for ProgressBarReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn report_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn report_progress(&self, update: &ProgressUpdate) {
        self.bar.set_position(update.progress.completed as u64);
        let name = update
            .item
            .file_name()
            .map_or_else(|| update.item.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.bar.set_message(name);
    }

    fn report_error(&self, item: &Path, error: &str) {
        self.bar
            .suspend(|| log::error!("Failed to process {}: {}", item.display(), error));
    }

    fn report_completion(&self, summary: &BatchSummary) {
        self.bar.set_position(summary.total() as u64);
        self.bar.finish_with_message(format!(
            "Completed! Processed: {}, Failed: {}",
            summary.succeeded(),
            summary.failed()
        ));
    }
}
