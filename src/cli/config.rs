//! Configuration conversion utilities for CLI arguments

use crate::batch::CommandRemover;
use crate::cli::main_impl::{EraseArgs, RemoveArgs};
use crate::config::{BatchConfig, EditorConfig};
use anyhow::{Context, Result};

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the editor configuration: JSON file first, then flag overrides
    pub(crate) fn editor_config(args: &EraseArgs) -> Result<EditorConfig> {
        let mut config = match &args.config {
            Some(path) => EditorConfig::from_json_file(path)
                .with_context(|| format!("Failed to load editor config {}", path.display()))?,
            None => EditorConfig::default(),
        };

        if let Some(tolerance) = args.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(fill) = args.fill {
            config.fill_color = fill;
        }
        if let Some(highlight) = args.highlight {
            config.highlight_color = highlight;
        }

        config.validate().context("Invalid editor configuration")?;
        Ok(config)
    }

    /// Build the batch configuration: JSON file first, then flag overrides
    pub(crate) fn batch_config(args: &RemoveArgs) -> Result<BatchConfig> {
        let mut config = match &args.config {
            Some(path) => BatchConfig::from_json_file(path)
                .with_context(|| format!("Failed to load batch config {}", path.display()))?,
            None => BatchConfig::default(),
        };

        if let Some(subfolder) = &args.subfolder {
            config.output_subfolder.clone_from(subfolder);
        }
        if let Some(extension) = &args.extension {
            config.output_extension.clone_from(extension);
        }
        if let Some(jobs) = args.jobs {
            config.max_concurrency = jobs;
        }

        config.validate().context("Invalid batch configuration")?;
        Ok(config)
    }

    /// Build the subprocess remover from `--tool` and `--tool-arg`
    pub(crate) fn remover(args: &RemoveArgs) -> CommandRemover {
        match (&args.tool, args.tool_args.is_empty()) {
            (None, true) => CommandRemover::default(),
            (None, false) => CommandRemover::default().with_args(args.tool_args.iter().cloned()),
            (Some(tool), true) => CommandRemover::new(tool.clone()),
            (Some(tool), false) => {
                CommandRemover::new(tool.clone()).with_args(args.tool_args.iter().cloned())
            },
        }
    }
}
