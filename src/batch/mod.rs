//! Batch background removal
//!
//! A batch is a [`BatchPlan`] of independent items, each mapping an input
//! image to `input_dir/<subfolder>/<stem>.<ext>`. [`BatchProcessor`] runs the
//! items with bounded concurrency through a [`BackgroundRemover`] and
//! collects a per-item [`BatchSummary`]; one failing item never aborts the
//! rest.

pub mod processor;
pub mod remover;

pub use processor::BatchProcessor;
pub use remover::{BackgroundRemover, CommandRemover, DEFAULT_REMOVER_PROGRAM};

use crate::config::BatchConfig;
use crate::error::{Result, TouchupError};
use crate::services::BatchProgress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Output location for `input` under the configured subfolder
///
/// # Errors
/// Returns [`TouchupError::InvalidConfig`] when `input` has no file stem.
///
/// # Examples
/// ```rust
/// use bgtouch::{batch::output_path_for, BatchConfig};
/// use std::path::Path;
///
/// let output = output_path_for(Path::new("/photos/rack.jpg"), &BatchConfig::default())?;
/// assert_eq!(output, Path::new("/photos/Remove_background/rack.png"));
/// # Ok::<(), bgtouch::TouchupError>(())
/// ```
pub fn output_path_for(input: &Path, config: &BatchConfig) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| {
        TouchupError::invalid_config(format!("Input has no file name: {}", input.display()))
    })?;

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(&config.output_extension);

    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(&config.output_subfolder).join(file_name))
}

/// One unit of batch work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Earlier input that already writes to `output`; such items are never run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts_with: Option<PathBuf>,
}

/// Ordered list of items to process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    items: Vec<BatchItem>,
}

impl BatchPlan {
    /// Plan one item per input, in the given order
    ///
    /// Inputs whose output is already claimed by an earlier input (for example
    /// `photo.jpg` and `photo.png` in one folder) are marked with
    /// [`BatchItem::conflicts_with`] and fail on their own when the plan runs.
    ///
    /// # Errors
    /// Returns [`TouchupError::InvalidConfig`] when an input has no file stem.
    pub fn new<I, P>(inputs: I, config: &BatchConfig) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut items = Vec::new();

        for input in inputs {
            let input = input.as_ref();
            let output = output_path_for(input, config)?;
            let conflicts_with = match claimed.get(&output) {
                Some(owner) => {
                    log::warn!(
                        "{} and {} both map to {}",
                        owner.display(),
                        input.display(),
                        output.display()
                    );
                    Some(owner.clone())
                },
                None => {
                    claimed.insert(output.clone(), input.to_path_buf());
                    None
                },
            };

            items.push(BatchItem {
                input: input.to_path_buf(),
                output,
                conflicts_with,
            });
        }

        Ok(Self { items })
    }

    #[must_use]
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn into_items(self) -> Vec<BatchItem> {
        self.items
    }
}

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Error description when the item failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl BatchItemResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of a finished batch, in plan order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub items: Vec<BatchItemResult>,
}

impl BatchSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.succeeded()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Final progress: every item counted as completed
    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        BatchProgress {
            completed: self.total(),
            failed: self.failed(),
            total: self.total(),
        }
    }

    /// Input to output pairs of the successful items, in plan order
    pub fn outputs(&self) -> impl Iterator<Item = (&Path, &Path)> + '_ {
        self.items
            .iter()
            .filter(|item| item.succeeded())
            .map(|item| (item.input.as_path(), item.output.as_path()))
    }

    /// Output of the first successful item, the natural image to edit next
    #[must_use]
    pub fn first_output(&self) -> Option<&Path> {
        self.outputs().next().map(|(_, output)| output)
    }

    /// Failed items with their error descriptions
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> + '_ {
        self.items
            .iter()
            .filter_map(|item| item.error.as_deref().map(|e| (item.input.as_path(), e)))
    }

    /// Write the summary as pretty-printed JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TouchupError::internal(format!("Failed to serialize batch summary: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| TouchupError::file_io_error("write batch summary", path, &e))
    }
}
