//! Concurrent batch runner

use super::{BackgroundRemover, BatchItem, BatchItemResult, BatchPlan, BatchSummary};
use crate::config::BatchConfig;
use crate::error::{Result, TouchupError};
use crate::services::{BatchProgress, NoOpProgressReporter, ProgressReporter, ProgressUpdate};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use instant::Instant;
use std::path::Path;
use std::sync::Arc;
use tracing::{info_span, Instrument};

/// Runs background removal over a set of images
pub struct BatchProcessor {
    remover: Arc<dyn BackgroundRemover>,
    config: BatchConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl BatchProcessor {
    /// Create a processor with a validated configuration and no progress output
    ///
    /// # Errors
    /// Returns [`TouchupError::InvalidConfig`] when `config` fails validation.
    pub fn new(remover: Arc<dyn BackgroundRemover>, config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            remover,
            config,
            reporter: Arc::new(NoOpProgressReporter),
        })
    }

    /// Send progress to `reporter`
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Plan the outputs for `inputs` without running anything
    pub fn plan<I, P>(&self, inputs: I) -> Result<BatchPlan>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        BatchPlan::new(inputs, &self.config)
    }

    /// Plan and run a batch
    ///
    /// # Errors
    /// Only planning fails the call; per-item failures are recorded in the summary.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgtouch::batch::{BatchProcessor, CommandRemover};
    /// use bgtouch::BatchConfig;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> bgtouch::Result<()> {
    /// let processor = BatchProcessor::new(Arc::new(CommandRemover::default()), BatchConfig::default())?;
    /// let summary = processor.run(["shots/a.jpg", "shots/b.jpg"]).await?;
    /// println!("{} of {} succeeded", summary.succeeded(), summary.total());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<I, P>(&self, inputs: I) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let plan = self.plan(inputs)?;
        Ok(self.run_plan(plan).await)
    }

    /// Run every item of `plan`, at most `effective_concurrency()` at a time
    ///
    /// Items finish in any order; the summary lists them in plan order. The
    /// reporter sees one update per finished item and a completion call once
    /// all are done, even for an empty plan.
    pub async fn run_plan(&self, plan: BatchPlan) -> BatchSummary {
        let started_at = Utc::now();
        let start = Instant::now();
        let total = plan.len();
        let concurrency = self.config.effective_concurrency().max(1);

        tracing::info!(
            total,
            concurrency,
            remover = self.remover.name(),
            "Starting background removal batch"
        );
        self.reporter.report_started(total);

        let mut progress = BatchProgress::new(total);
        let mut slots: Vec<Option<BatchItemResult>> = vec![None; total];

        let mut finished = stream::iter(plan.into_items().into_iter().enumerate())
            .map(|(index, item)| {
                let remover = Arc::clone(&self.remover);
                let span = info_span!("remove_background", input = %item.input.display());
                async move { (index, process_item(remover, item).await) }.instrument(span)
            })
            .buffer_unordered(concurrency);

        while let Some((index, result)) = finished.next().await {
            progress.record(result.succeeded());

            if let Some(error) = &result.error {
                self.reporter.report_error(&result.input, error);
            }
            self.reporter.report_progress(&ProgressUpdate::new(
                progress,
                result.input.clone(),
                result.succeeded(),
                start,
            ));

            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(result);
            }
        }

        let summary = BatchSummary {
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            items: slots.into_iter().flatten().collect(),
        };

        tracing::info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            elapsed_ms = summary.elapsed_ms,
            "Background removal batch finished"
        );
        self.reporter.report_completion(&summary);
        summary
    }
}

async fn process_item(remover: Arc<dyn BackgroundRemover>, item: BatchItem) -> BatchItemResult {
    let start = Instant::now();
    let outcome = match &item.conflicts_with {
        Some(owner) => Err(TouchupError::processing_stage_error(
            "planning",
            &format!("output {} is already written by {}", item.output.display(), owner.display()),
            Some(&item.input.display().to_string()),
        )),
        None => match prepare_output_dir(&item.output).await {
            Ok(()) => remover.remove_background(&item.input, &item.output).await,
            Err(e) => Err(e),
        },
    };

    let error = match outcome {
        Ok(()) => {
            log::debug!("Processed: {} -> {}", item.input.display(), item.output.display());
            None
        },
        Err(e) => Some(e.to_string()),
    };

    BatchItemResult {
        input: item.input,
        output: item.output,
        error,
        elapsed_ms: start.elapsed().as_millis() as u64,
    }
}

async fn prepare_output_dir(output: &Path) -> Result<()> {
    match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TouchupError::file_io_error("create output directory", parent, &e)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Copies the input to the output, failing for inputs named `bad*`
    struct CopyRemover {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CopyRemover {
        fn new() -> Self {
            Self {
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BackgroundRemover for CopyRemover {
        async fn remove_background(&self, input: &Path, output: &Path) -> Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.starts_with("bad") {
                return Err(TouchupError::processing(format!("cannot process {}", name)));
            }
            std::fs::copy(input, output)
                .map(|_| ())
                .map_err(|e| TouchupError::file_io_error("copy", input, &e))
        }

        fn name(&self) -> &str {
            "copy"
        }
    }

    fn write_inputs(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(dir.path(), &["a.jpg", "bad.jpg", "c.jpg"]);

        let processor =
            BatchProcessor::new(Arc::new(CopyRemover::new()), BatchConfig::default()).unwrap();
        let summary = processor.run(&inputs).await.unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.items[1].input, inputs[1]);
        assert!(summary.items[1].error.as_deref().unwrap().contains("bad.jpg"));
        assert!(dir.path().join("Remove_background").join("a.png").exists());
        assert!(dir.path().join("Remove_background").join("c.png").exists());
    }

    #[tokio::test]
    async fn test_shared_output_runs_only_first_input() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(dir.path(), &["photo.jpg", "photo.png", "other.jpg"]);

        let processor =
            BatchProcessor::new(Arc::new(CopyRemover::new()), BatchConfig::default()).unwrap();
        let summary = processor.run(&inputs).await.unwrap();

        assert_eq!(summary.succeeded(), 2);
        assert!(summary.items[0].succeeded());
        let error = summary.items[1].error.as_deref().unwrap();
        assert!(error.contains("photo.jpg"), "{}", error);

        let output = dir.path().join("Remove_background").join("photo.png");
        assert_eq!(std::fs::read(output).unwrap(), b"photo.jpg");
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..8).map(|i| format!("img{}.png", i)).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let inputs = write_inputs(dir.path(), &name_refs);

        let remover = Arc::new(CopyRemover::new());
        let config = BatchConfig::builder().max_concurrency(2).build().unwrap();
        let processor = BatchProcessor::new(remover.clone(), config).unwrap();
        let summary = processor.run(&inputs).await.unwrap();

        assert_eq!(summary.succeeded(), 8);
        assert!(remover.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_empty_batch_completes() {
        let processor =
            BatchProcessor::new(Arc::new(CopyRemover::new()), BatchConfig::default()).unwrap();
        let summary = processor.run(Vec::<PathBuf>::new()).await.unwrap();
        assert_eq!(summary.total(), 0);
        assert_eq!(summary.progress().percentage(), 100);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BatchConfig {
            output_extension: ".png".to_string(),
            ..BatchConfig::default()
        };
        assert!(BatchProcessor::new(Arc::new(CopyRemover::new()), config).is_err());
    }
}
