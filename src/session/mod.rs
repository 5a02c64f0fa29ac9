//! Interactive touch-up session
//!
//! An [`EditSession`] binds one loaded image to at most one active selection.
//! It moves between two states:
//!
//! - `Clean`: no selection; the presenter shows the plain image
//! - `Selected`: a non-empty mask is active; the presenter shows a preview
//!   with the masked pixels recolored
//!
//! Selecting replaces the active mask, deleting paints the masked pixels with
//! the fill color, and deselecting discards the mask. Bad clicks and missing
//! selections are reported as soft [`EditOutcome`]s; only operating without
//! a loaded image is an error.

pub mod overlay;
pub mod worker;

pub use overlay::{apply_fill, render_overlay};
pub use worker::{SelectionJob, SelectionJobResult};

use crate::color::LabImage;
use crate::config::EditorConfig;
use crate::error::{Result, TouchupError};
use crate::selection::RegionSelector;
use crate::services::ImageIOService;
use crate::types::{ImagePoint, SelectionMask};
use crate::viewport::{DisplayPoint, Viewport};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Whether a session currently holds an active selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Clean,
    Selected,
}

/// Result of a session operation
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// A new non-empty selection replaced any previous one
    Selected { seed: ImagePoint, pixel_count: usize },
    /// The active selection was painted with the fill color
    Deleted { pixel_count: usize },
    /// The active selection was discarded
    Deselected,
    /// The click did not land on the image; nothing changed
    OutOfBounds { x: f64, y: f64 },
    /// The fill selected no pixels; any previous selection is gone
    EmptySelection { seed: ImagePoint },
    /// Delete or deselect was requested without an active selection
    NothingSelected,
    /// A background selection finished after a newer request and was dropped
    Superseded { seed: ImagePoint },
}

impl EditOutcome {
    /// True for outcomes that report a rejected request rather than a change
    #[must_use]
    pub fn is_soft_failure(&self) -> bool {
        matches!(
            self,
            Self::OutOfBounds { .. }
                | Self::EmptySelection { .. }
                | Self::NothingSelected
                | Self::Superseded { .. }
        )
    }
}

impl fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selected { seed, pixel_count } => {
                write!(f, "selected {} pixel(s) from {}", pixel_count, seed)
            },
            Self::Deleted { pixel_count } => write!(f, "deleted {} pixel(s)", pixel_count),
            Self::Deselected => write!(f, "selection cleared"),
            Self::OutOfBounds { x, y } => write!(f, "click ({}, {}) is outside the image", x, y),
            Self::EmptySelection { seed } => write!(f, "nothing similar to the color at {}", seed),
            Self::NothingSelected => write!(f, "no region selected"),
            Self::Superseded { seed } => write!(f, "selection at {} superseded", seed),
        }
    }
}

/// A frame handed to the presentation layer
#[derive(Debug)]
pub enum Frame<'a> {
    /// The current image, unmodified
    Plain(&'a RgbImage),
    /// A copy of the image with the active selection highlighted
    Preview(RgbImage),
}

impl Frame<'_> {
    #[must_use]
    pub fn image(&self) -> &RgbImage {
        match self {
            Frame::Plain(image) => *image,
            Frame::Preview(image) => image,
        }
    }

    #[must_use]
    pub fn is_preview(&self) -> bool {
        matches!(self, Frame::Preview(_))
    }
}

/// Receives redraw requests whenever the image or the selection changes
pub trait Presenter: Send {
    fn present(&mut self, frame: Frame<'_>);
}

/// Presenter that ignores every frame, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&mut self, _frame: Frame<'_>) {}
}

/// User input understood by [`EditSession::handle_event`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer press at a display-region position
    PointerPress(DisplayPoint),
    /// Commit the active selection (Delete key)
    DeleteSelection,
    /// Drop the active selection (Escape key)
    CancelSelection,
}

#[derive(Debug)]
struct LoadedImage {
    image: RgbImage,
    lab: Arc<LabImage>,
    format: Option<ImageFormat>,
    source: Option<PathBuf>,
}

impl LoadedImage {
    fn new(image: RgbImage, format: Option<ImageFormat>, source: Option<PathBuf>) -> Self {
        let lab = Arc::new(LabImage::from_rgb(&image));
        Self {
            image,
            lab,
            format,
            source,
        }
    }
}

/// Stateful editing context for one image
pub struct EditSession {
    config: EditorConfig,
    selector: RegionSelector,
    loaded: Option<LoadedImage>,
    mask: Option<SelectionMask>,
    generation: u64,
    presenter: Box<dyn Presenter>,
}

impl fmt::Debug for EditSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("dimensions", &self.loaded.as_ref().map(|l| l.image.dimensions()))
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl EditSession {
    /// Create a headless session with no image loaded
    ///
    /// # Errors
    /// Returns [`TouchupError::InvalidConfig`] when the configuration fails validation.
    pub fn new(config: EditorConfig) -> Result<Self> {
        Self::with_presenter(config, Box::new(NullPresenter))
    }

    /// Create a session that sends redraws to `presenter`
    pub fn with_presenter(config: EditorConfig, presenter: Box<dyn Presenter>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            selector: RegionSelector::new(config.tolerance),
            config,
            loaded: None,
            mask: None,
            generation: 0,
            presenter,
        })
    }

    /// Replace the presentation collaborator and redraw into it
    pub fn set_presenter(&mut self, presenter: Box<dyn Presenter>) {
        self.presenter = presenter;
        self.redraw();
    }

    /// Load an image file and enter edit mode
    ///
    /// On failure the session keeps whatever it had loaded before.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgtouch::{EditSession, EditorConfig, ImagePoint};
    ///
    /// let mut session = EditSession::new(EditorConfig::default())?;
    /// session.open("photo_no_bg.png")?;
    /// session.select_at(ImagePoint::new(10, 20))?;
    /// session.delete_selection()?;
    /// session.save("photo_clean.png")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let decoded = ImageIOService::load_with_format(path)?;
        log::info!("Entered edit mode for {}", path.display());
        self.install(LoadedImage::new(
            decoded.image.to_rgb8(),
            decoded.format,
            Some(path.to_path_buf()),
        ));
        Ok(())
    }

    /// Load an in-memory image and enter edit mode
    pub fn load_image(&mut self, image: RgbImage) {
        self.install(LoadedImage::new(image, None, None));
    }

    fn install(&mut self, loaded: LoadedImage) {
        self.loaded = Some(loaded);
        self.mask = None;
        self.generation += 1;
        self.redraw();
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.mask.is_some() {
            SessionState::Selected
        } else {
            SessionState::Clean
        }
    }

    #[must_use]
    pub fn has_image(&self) -> bool {
        self.loaded.is_some()
    }

    #[must_use]
    pub fn image(&self) -> Option<&RgbImage> {
        self.loaded.as_ref().map(|loaded| &loaded.image)
    }

    /// The active selection, if any
    #[must_use]
    pub fn selection(&self) -> Option<&SelectionMask> {
        self.mask.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Path the current image was opened from
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.loaded.as_ref().and_then(|loaded| loaded.source.as_deref())
    }

    /// Format the current image was decoded from
    #[must_use]
    pub fn source_format(&self) -> Option<ImageFormat> {
        self.loaded.as_ref().and_then(|loaded| loaded.format)
    }

    fn require_image(&self, operation: &str) -> Result<&LoadedImage> {
        self.loaded
            .as_ref()
            .ok_or_else(|| TouchupError::no_image_loaded(operation))
    }

    /// Grow a selection from `seed`, replacing any active selection
    ///
    /// An out-of-bounds seed leaves the session untouched.
    pub fn select_at(&mut self, seed: ImagePoint) -> Result<EditOutcome> {
        let job = self.begin_selection(seed)?;
        let result = job.run();
        self.finish_selection(result)
    }

    /// Capture a selection request to run elsewhere
    ///
    /// In-bounds requests invalidate every job issued before them. Pass the
    /// job's result to [`EditSession::finish_selection`].
    pub fn begin_selection(&mut self, seed: ImagePoint) -> Result<SelectionJob> {
        let loaded = self.require_image("select region")?;
        let lab = Arc::clone(&loaded.lab);
        let (width, height) = lab.dimensions();

        if seed.is_within(width, height) {
            self.generation += 1;
        }

        Ok(SelectionJob {
            generation: self.generation,
            seed,
            selector: self.selector.clone(),
            lab,
        })
    }

    /// Apply the result of a [`SelectionJob`]
    ///
    /// Results from jobs issued before the latest selection, delete,
    /// deselect or image load are discarded as [`EditOutcome::Superseded`],
    /// as are results from jobs issued by another session.
    pub fn finish_selection(&mut self, result: SelectionJobResult) -> Result<EditOutcome> {
        let loaded = self.require_image("select region")?;
        let seed = result.seed;

        if !Arc::ptr_eq(&result.lab, &loaded.lab) {
            log::debug!("Dropping selection at {} grown on a different image", seed);
            return Ok(EditOutcome::Superseded { seed });
        }

        let Some(mask) = result.mask else {
            log::warn!("Click {} is outside the image; selection unchanged", seed);
            return Ok(EditOutcome::OutOfBounds {
                x: f64::from(seed.x),
                y: f64::from(seed.y),
            });
        };

        if result.generation != self.generation {
            log::debug!(
                "Dropping selection at {} from generation {} (current {})",
                seed,
                result.generation,
                self.generation
            );
            return Ok(EditOutcome::Superseded { seed });
        }

        let pixel_count = mask.count();
        if pixel_count == 0 {
            log::info!("No pixels within tolerance of the color at {}", seed);
            self.mask = None;
            self.redraw();
            return Ok(EditOutcome::EmptySelection { seed });
        }

        if let Some(bounds) = mask.bounds() {
            log::info!(
                "Selected {} pixel(s) from {} within {}x{} at ({}, {})",
                pixel_count,
                seed,
                bounds.width,
                bounds.height,
                bounds.x,
                bounds.y
            );
        }
        self.mask = Some(mask);
        self.redraw();
        Ok(EditOutcome::Selected { seed, pixel_count })
    }

    /// Run a selection on the blocking thread pool
    ///
    /// The flood fill runs off the async executor; the result is applied with
    /// the same last-request-wins rule as [`EditSession::finish_selection`].
    pub async fn select_at_async(&mut self, seed: ImagePoint) -> Result<EditOutcome> {
        let job = self.begin_selection(seed)?;
        let result = tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| TouchupError::task(format!("Selection task failed: {}", e)))?;
        self.finish_selection(result)
    }

    /// Paint the active selection with the fill color and clear it
    pub fn delete_selection(&mut self) -> Result<EditOutcome> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Err(TouchupError::no_image_loaded("delete selection"));
        };
        self.generation += 1;

        let Some(mask) = self.mask.take() else {
            log::info!("No regions selected");
            return Ok(EditOutcome::NothingSelected);
        };

        let pixel_count = apply_fill(&mut loaded.image, &mask, self.config.fill_color);
        loaded.lab = Arc::new(LabImage::from_rgb(&loaded.image));

        log::info!("Deleted selected region ({} pixel(s))", pixel_count);
        self.redraw();
        Ok(EditOutcome::Deleted { pixel_count })
    }

    /// Discard the active selection without touching the image
    pub fn deselect(&mut self) -> Result<EditOutcome> {
        self.require_image("deselect")?;
        self.generation += 1;

        if self.mask.take().is_none() {
            return Ok(EditOutcome::NothingSelected);
        }

        log::info!("Deselected current selection");
        self.redraw();
        Ok(EditOutcome::Deselected)
    }

    /// Dispatch one input event, mapping pointer positions through `viewport`
    pub fn handle_event(&mut self, event: InputEvent, viewport: &Viewport) -> Result<EditOutcome> {
        match event {
            InputEvent::PointerPress(point) => {
                let dimensions = self.require_image("select region")?.image.dimensions();
                match viewport.map_to_image(point, dimensions) {
                    Some(seed) => self.select_at(seed),
                    None => {
                        log::warn!(
                            "Click ({}, {}) maps outside the {}x{} image",
                            point.x,
                            point.y,
                            dimensions.0,
                            dimensions.1
                        );
                        Ok(EditOutcome::OutOfBounds {
                            x: point.x,
                            y: point.y,
                        })
                    },
                }
            },
            InputEvent::DeleteSelection => self.delete_selection(),
            InputEvent::CancelSelection => self.deselect(),
        }
    }

    /// The frame the presenter should currently show
    #[must_use]
    pub fn preview_frame(&self) -> Option<RgbImage> {
        let loaded = self.loaded.as_ref()?;
        Some(match &self.mask {
            Some(mask) => render_overlay(&loaded.image, mask, self.config.highlight_color),
            None => loaded.image.clone(),
        })
    }

    fn redraw(&mut self) {
        let Some(loaded) = self.loaded.as_ref() else {
            return;
        };
        let frame = match &self.mask {
            Some(mask) => Frame::Preview(render_overlay(
                &loaded.image,
                mask,
                self.config.highlight_color,
            )),
            None => Frame::Plain(&loaded.image),
        };
        self.presenter.present(frame);
    }

    /// Write the current image, keeping the source format when the path has no extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<ImageFormat> {
        let loaded = self.require_image("save image")?;
        let image = DynamicImage::ImageRgb8(loaded.image.clone());
        let format = ImageIOService::save_image(&image, path.as_ref(), loaded.format)?;
        log::info!("Saved edited image to {}", path.as_ref().display());
        Ok(format)
    }

    /// Consume the session, returning the edited image
    #[must_use]
    pub fn into_image(self) -> Option<RgbImage> {
        self.loaded.map(|loaded| loaded.image)
    }
}
