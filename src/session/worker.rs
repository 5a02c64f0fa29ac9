//! Off-thread selection jobs
//!
//! A job snapshots the session's Lab image and generation. Its result is
//! applied only if the session generation is unchanged when it arrives and
//! the session still holds the same Lab image, so a newer click, a delete, a
//! deselect, a new image or a job from another session all discard it.

use crate::color::LabImage;
use crate::selection::RegionSelector;
use crate::types::{ImagePoint, SelectionMask};
use std::sync::Arc;

/// A flood fill captured from an [`super::EditSession`], ready to run on any thread
#[derive(Debug, Clone)]
pub struct SelectionJob {
    pub(super) generation: u64,
    pub(super) seed: ImagePoint,
    pub(super) selector: RegionSelector,
    pub(super) lab: Arc<LabImage>,
}

impl SelectionJob {
    /// The seed pixel this job grows from
    #[must_use]
    pub fn seed(&self) -> ImagePoint {
        self.seed
    }

    /// Run the flood fill to completion on the calling thread
    #[must_use]
    pub fn run(self) -> SelectionJobResult {
        let mask = self.selector.select(&self.lab, self.seed);
        SelectionJobResult {
            generation: self.generation,
            seed: self.seed,
            mask,
            lab: self.lab,
        }
    }
}

/// Outcome of a [`SelectionJob`], to hand back to the session that issued it
#[derive(Debug, Clone)]
pub struct SelectionJobResult {
    pub(super) generation: u64,
    pub(super) seed: ImagePoint,
    pub(super) mask: Option<SelectionMask>,
    /// Lab image the mask was grown on
    pub(super) lab: Arc<LabImage>,
}

impl SelectionJobResult {
    #[must_use]
    pub fn seed(&self) -> ImagePoint {
        self.seed
    }

    /// The computed mask, `None` when the seed was outside the image
    #[must_use]
    pub fn mask(&self) -> Option<&SelectionMask> {
        self.mask.as_ref()
    }
}
