//! Progress reporting service
//!
//! This module separates progress reporting concerns from batch orchestration,
//! allowing different frontends (console, progress bar, GUI channel) to
//! implement their own progress handling.

use crate::batch::BatchSummary;
use instant::Instant;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Aggregate progress of a batch: how many of its independent tasks have finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchProgress {
    /// Tasks that finished, successfully or not
    pub completed: usize,
    /// Finished tasks that reported a failure
    pub failed: usize,
    /// Total number of tasks in the batch
    pub total: usize,
}

impl BatchProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            failed: 0,
            total,
        }
    }

    /// Completed fraction in `0.0..=1.0`; an empty batch counts as done
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed.min(self.total) as f64 / self.total as f64
        }
    }

    /// Completed share as a whole percentage (`completed * 100 / total`)
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            100
        } else {
            (self.completed.min(self.total) * 100 / self.total) as u8
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Record one finished task
    pub fn record(&mut self, succeeded: bool) {
        self.completed += 1;
        if !succeeded {
            self.failed += 1;
        }
    }
}

/// Progress update emitted each time a batch task finishes
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Aggregate progress after this task
    pub progress: BatchProgress,
    /// Input path of the task that just finished
    pub item: PathBuf,
    /// Whether that task succeeded
    pub succeeded: bool,
    /// Elapsed time since the batch started (milliseconds)
    pub elapsed_ms: u64,
    /// Estimated time remaining (milliseconds, if available)
    pub eta_ms: Option<u64>,
}

impl ProgressUpdate {
    /// Create an update, estimating the remaining time from the average task duration
    #[must_use]
    pub fn new(progress: BatchProgress, item: PathBuf, succeeded: bool, start_time: Instant) -> Self {
        let elapsed_ms = start_time.elapsed().as_millis() as u64;

        Self {
            progress,
            item,
            succeeded,
            elapsed_ms,
            eta_ms: estimate_remaining_ms(elapsed_ms, progress),
        }
    }
}

/// Remaining time at the average pace so far, `None` before the first task finishes
fn estimate_remaining_ms(elapsed_ms: u64, progress: BatchProgress) -> Option<u64> {
    let remaining = progress.total.saturating_sub(progress.completed) as u64;
    (progress.completed > 0).then(|| elapsed_ms.saturating_mul(remaining) / progress.completed as u64)
}

/// Trait for reporting progress during batch background removal
pub trait ProgressReporter: Send + Sync {
    /// Report that a batch of `total` tasks is starting
    fn report_started(&self, total: usize);

    /// Report a finished task
    fn report_progress(&self, update: &ProgressUpdate);

    /// Report a failed task
    ///
    /// # Arguments
    /// * `item` - Input path of the failed task
    /// * `error` - Error description
    fn report_error(&self, item: &Path, error: &str);

    /// Report that every task has finished
    fn report_completion(&self, summary: &BatchSummary);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_started(&self, _total: usize) {
        // Intentionally empty - discards start notification
    }

    fn report_progress(&self, _update: &ProgressUpdate) {
        // Intentionally empty - discards progress updates
    }

    fn report_error(&self, _item: &Path, _error: &str) {
        // Intentionally empty - discards error reports
    }

    fn report_completion(&self, _summary: &BatchSummary) {
        // Intentionally empty - discards completion notification
    }
}

/// Console progress reporter that logs progress through `log`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to show timing details with each update
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_started(&self, total: usize) {
        log::info!("Removing backgrounds from {} image(s)", total);
    }

    fn report_progress(&self, update: &ProgressUpdate) {
        let status = if update.succeeded { "done" } else { "failed" };
        if self.verbose {
            match update.eta_ms {
                Some(eta) => log::info!(
                    "[{}%] {} {} ({}ms elapsed, ~{}ms remaining)",
                    update.progress.percentage(),
                    status,
                    update.item.display(),
                    update.elapsed_ms,
                    eta
                ),
                None => log::info!(
                    "[{}%] {} {} ({}ms elapsed)",
                    update.progress.percentage(),
                    status,
                    update.item.display(),
                    update.elapsed_ms
                ),
            }
        } else {
            log::info!(
                "[{}%] {} {}",
                update.progress.percentage(),
                status,
                update.item.display()
            );
        }
    }

    fn report_error(&self, item: &Path, error: &str) {
        log::error!("Background removal failed for {}: {}", item.display(), error);
    }

    fn report_completion(&self, summary: &BatchSummary) {
        log::info!(
            "Batch completed in {}ms: {} succeeded, {} failed",
            summary.elapsed_ms,
            summary.succeeded(),
            summary.failed()
        );
    }
}

/// Progress reporter publishing the latest [`BatchProgress`] on a watch channel
///
/// Suited to UI layers that poll or await progress changes; receivers always
/// observe the most recent value, ending at a complete batch.
pub struct WatchProgressReporter {
    sender: watch::Sender<BatchProgress>,
}

impl WatchProgressReporter {
    /// Create a reporter and the receiver observing it
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<BatchProgress>) {
        let (sender, receiver) = watch::channel(BatchProgress::default());
        (Self { sender }, receiver)
    }
}

impl ProgressReporter for WatchProgressReporter {
    fn report_started(&self, total: usize) {
        self.sender.send_replace(BatchProgress::new(total));
    }

    fn report_progress(&self, update: &ProgressUpdate) {
        self.sender.send_replace(update.progress);
    }

    fn report_error(&self, _item: &Path, _error: &str) {
        // Failures are already counted in the progress update
    }

    fn report_completion(&self, summary: &BatchSummary) {
        self.sender.send_replace(summary.progress());
    }
}
