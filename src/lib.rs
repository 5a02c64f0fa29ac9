#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # bgtouch
//!
//! Batch background removal followed by one-click region touch-up.
//!
//! Background removal itself is delegated to an external tool run once per
//! image. What the crate implements is everything around it: running a batch
//! with bounded concurrency and progress, and an editing session that selects
//! a color-similar connected region with a flood fill in CIE L\*a\*b\* space
//! and erases it.
//!
//! ## Features
//!
//! - **Region Selection**: 4-connected flood fill with a perceptual (Lab) color tolerance
//! - **Edit Sessions**: select, preview, delete and deselect with a single active mask
//! - **Off-thread Selection**: last-request-wins jobs for responsive frontends
//! - **Batch Removal**: concurrent subprocess-backed removal with per-item results
//! - **Format Support**: JPEG, PNG, WebP, BMP, TIFF, GIF
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ### Touching up an image
//!
//! ```rust,no_run
//! use bgtouch::{EditOutcome, EditSession, EditorConfig, ImagePoint};
//!
//! # fn example() -> bgtouch::Result<()> {
//! let config = EditorConfig::builder().tolerance(25.0).build()?;
//! let mut session = EditSession::new(config)?;
//! session.open("Remove_background/rack.png")?;
//!
//! if let EditOutcome::Selected { pixel_count, .. } = session.select_at(ImagePoint::new(40, 300))? {
//!     println!("selected {pixel_count} pixels");
//!     session.delete_selection()?;
//! }
//! session.save("Remove_background/rack.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Running a batch
//!
//! ```rust,no_run
//! use bgtouch::batch::{BatchProcessor, CommandRemover};
//! use bgtouch::BatchConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> bgtouch::Result<()> {
//! let processor = BatchProcessor::new(Arc::new(CommandRemover::default()), BatchConfig::default())?;
//! let summary = processor.run(["photos/a.jpg", "photos/b.jpg"]).await?;
//! for (input, output) in summary.outputs() {
//!     println!("{} -> {}", input.display(), output.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface, progress bar and tracing setup
//! - `webp-support` (default): WebP image format support
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bgtouch = { version = "0.1", default-features = false }
//! ```

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod selection;
pub mod services;
pub mod session;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod viewport;

// Public API exports
pub use batch::{
    output_path_for, BackgroundRemover, BatchItemResult, BatchPlan, BatchProcessor, BatchSummary,
    CommandRemover,
};
pub use color::{lab_distance, rgb_to_lab8, Lab8, LabImage};
pub use config::{BatchConfig, EditorConfig};
pub use error::{Result, TouchupError};
pub use selection::{select_region, RegionSelector};
pub use services::{
    BatchProgress, ConsoleProgressReporter, ImageIOService, NoOpProgressReporter,
    ProgressReporter, ProgressUpdate, WatchProgressReporter,
};
pub use session::{
    EditOutcome, EditSession, Frame, InputEvent, NullPresenter, Presenter, SessionState,
};
pub use types::{ImagePoint, SelectionBounds, SelectionMask};
pub use viewport::{DisplayPoint, Viewport};
