//! Configuration types for touch-up editing and batch background removal

use crate::error::{Result, TouchupError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default flood-fill tolerance in 8-bit Lab distance units
pub const DEFAULT_TOLERANCE: f32 = 20.0;

/// Default fill value written over deleted regions (white)
pub const DEFAULT_FILL_COLOR: [u8; 3] = [255, 255, 255];

/// Default recolor applied to selected pixels in the preview overlay (red)
pub const DEFAULT_HIGHLIGHT_COLOR: [u8; 3] = [255, 0, 0];

/// Default subfolder (next to each input) receiving background-removed outputs
pub const DEFAULT_OUTPUT_SUBFOLDER: &str = "Remove_background";

/// Default extension of background-removed outputs
pub const DEFAULT_OUTPUT_EXTENSION: &str = "png";

/// Configuration for an edit session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum Lab distance (exclusive) from the seed color for a pixel to be selected
    pub tolerance: f32,

    /// RGB value written into every selected pixel on delete
    pub fill_color: [u8; 3],

    /// RGB value used to paint the selection in preview frames
    pub highlight_color: [u8; 3],
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            fill_color: DEFAULT_FILL_COLOR,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR,
        }
    }
}

impl EditorConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use bgtouch::EditorConfig;
    ///
    /// let config = EditorConfig::builder()
    ///     .tolerance(12.5)
    ///     .fill_color([0, 0, 0])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.fill_color, [0, 0, 0]);
    /// ```
    #[must_use]
    pub fn builder() -> EditorConfigBuilder {
        EditorConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Tolerance is negative, NaN or infinite
    ///
    /// # Examples
    /// ```rust
    /// use bgtouch::EditorConfig;
    ///
    /// let mut config = EditorConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.tolerance = -1.0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(TouchupError::config_value_error(
                "tolerance",
                self.tolerance,
                "finite, >= 0",
                Some(DEFAULT_TOLERANCE),
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for `EditorConfig`
#[derive(Debug, Default)]
pub struct EditorConfigBuilder {
    config: EditorConfig,
}

impl EditorConfigBuilder {
    /// Set the flood-fill tolerance
    #[must_use]
    pub fn tolerance(mut self, tolerance: f32) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Set the fill value used on delete
    #[must_use]
    pub fn fill_color(mut self, color: [u8; 3]) -> Self {
        self.config.fill_color = color;
        self
    }

    /// Set the preview highlight color
    #[must_use]
    pub fn highlight_color(mut self, color: [u8; 3]) -> Self {
        self.config.highlight_color = color;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Configuration validation failures (see [`EditorConfig::validate`])
    pub fn build(self) -> Result<EditorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration for batch background removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Subfolder created next to each input that receives its output
    pub output_subfolder: String,

    /// Extension (without dot) of every output file
    pub output_extension: String,

    /// Maximum number of removal tasks running at once (0 = available parallelism)
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_subfolder: DEFAULT_OUTPUT_SUBFOLDER.to_string(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
            max_concurrency: 0,
        }
    }
}

impl BatchConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Empty output subfolder or extension
    /// - Extension starting with a dot
    /// - Subfolder that is not a single relative path component
    pub fn validate(&self) -> Result<()> {
        if self.output_subfolder.trim().is_empty() {
            return Err(TouchupError::invalid_config("Output subfolder cannot be empty"));
        }

        let subfolder = Path::new(&self.output_subfolder);
        if subfolder.is_absolute() || subfolder.components().count() != 1 {
            return Err(TouchupError::invalid_config(format!(
                "Output subfolder must be a single relative directory name, got '{}'",
                self.output_subfolder
            )));
        }

        if self.output_extension.is_empty() {
            return Err(TouchupError::invalid_config("Output extension cannot be empty"));
        }

        if self.output_extension.starts_with('.') {
            return Err(TouchupError::invalid_config(format!(
                "Output extension must not start with a dot, got '{}'",
                self.output_extension
            )));
        }

        Ok(())
    }

    /// Resolve the concurrency limit, replacing 0 with the available parallelism
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrency > 0 {
            self.max_concurrency
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        }
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for `BatchConfig`
#[derive(Debug, Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    /// Set the output subfolder name
    #[must_use]
    pub fn output_subfolder<S: Into<String>>(mut self, subfolder: S) -> Self {
        self.config.output_subfolder = subfolder.into();
        self
    }

    /// Set the output extension (without dot)
    #[must_use]
    pub fn output_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.config.output_extension = extension.into();
        self
    }

    /// Set the maximum number of concurrent removal tasks (0 = auto)
    #[must_use]
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Configuration validation failures (see [`BatchConfig::validate`])
    pub fn build(self) -> Result<BatchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TouchupError::file_io_error("read config file", path, &e))?;
    serde_json::from_str(&content).map_err(|e| {
        TouchupError::invalid_config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}
