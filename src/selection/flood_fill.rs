//! Flood-fill region selection in Lab space.
//!
//! Grows a region breadth-first from a seed pixel over 4-connected neighbors
//! (diagonal-only contact does not connect) and keeps every reached pixel
//! whose Lab distance to the seed color is strictly below the tolerance.

use crate::color::{lab_distance, LabImage};
use crate::config::DEFAULT_TOLERANCE;
use crate::types::{ImagePoint, SelectionMask};
use image::RgbImage;
use std::collections::VecDeque;
use tracing::{instrument, trace};

/// 4-connected neighbor offsets: right, left, down, up
const NEIGHBORS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Flood-fill selector with a fixed tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSelector {
    tolerance: f32,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl RegionSelector {
    /// Create a selector. Negative or NaN tolerances select nothing.
    #[must_use]
    pub fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }

    #[must_use]
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Grow the region containing `seed`.
    ///
    /// Returns `None` when the seed lies outside the image. Otherwise the mask
    /// has the image's dimensions and is false everywhere outside the grown
    /// region; it is empty only when the tolerance is not positive.
    ///
    /// # Examples
    /// ```rust
    /// use bgtouch::{color::LabImage, ImagePoint, RegionSelector};
    /// use image::{Rgb, RgbImage};
    ///
    /// let image = RgbImage::from_pixel(4, 4, Rgb([30, 90, 30]));
    /// let lab = LabImage::from_rgb(&image);
    ///
    /// let mask = RegionSelector::default()
    ///     .select(&lab, ImagePoint::new(1, 1))
    ///     .unwrap();
    /// assert_eq!(mask.count(), 16);
    ///
    /// assert!(RegionSelector::default().select(&lab, ImagePoint::new(4, 0)).is_none());
    /// ```
    #[instrument(level = "debug", skip(self, lab), fields(tolerance = self.tolerance))]
    #[must_use]
    pub fn select(&self, lab: &LabImage, seed: ImagePoint) -> Option<SelectionMask> {
        let (width, height) = lab.dimensions();
        let seed_color = lab.get(seed.x, seed.y)?;
        trace!(?seed_color, "seed color");

        let mut mask = SelectionMask::new(width, height);
        let mut visited = vec![false; width as usize * height as usize];
        let mut queue: VecDeque<(i64, i64)> = VecDeque::new();
        queue.push_back((i64::from(seed.x), i64::from(seed.y)));

        while let Some((cx, cy)) = queue.pop_front() {
            if cx < 0 || cy < 0 || cx >= i64::from(width) || cy >= i64::from(height) {
                continue;
            }
            let (x, y) = (cx as u32, cy as u32);
            let idx = y as usize * width as usize + x as usize;
            match visited.get_mut(idx) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }

            let Some(color) = lab.get(x, y) else {
                continue;
            };
            if lab_distance(color, seed_color) < self.tolerance {
                mask.insert(x, y);
                queue.extend(NEIGHBORS.iter().map(|(dx, dy)| (cx + dx, cy + dy)));
            }
        }

        Some(mask)
    }
}

/// Select the region around `(seed_x, seed_y)`.
///
/// `lab` must be the Lab representation of `image`; a dimension mismatch
/// yields `None` just like an out-of-bounds seed.
#[must_use]
pub fn select_region(
    image: &RgbImage,
    lab: &LabImage,
    seed_x: u32,
    seed_y: u32,
    tolerance: f32,
) -> Option<SelectionMask> {
    if image.dimensions() != lab.dimensions() {
        log::warn!(
            "Lab representation {:?} does not match image {:?}; no selection made",
            lab.dimensions(),
            image.dimensions()
        );
        return None;
    }
    RegionSelector::new(tolerance).select(lab, ImagePoint::new(seed_x, seed_y))
}
