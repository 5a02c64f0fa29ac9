//! Core types shared by the region selector and the edit session

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// A pixel coordinate inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImagePoint {
    pub x: u32,
    pub y: u32,
}

impl ImagePoint {
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Whether the point lies inside an image of the given dimensions
    #[must_use]
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.x < width && self.y < height
    }
}

impl std::fmt::Display for ImagePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned bounds of a selection, inclusive of its edge pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Boolean grid marking the pixels of the active selection
///
/// Always has the dimensions of the image it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl SelectionMask {
    /// Create an all-false mask
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Whether the pixel at `(x, y)` is selected; false outside the mask
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.index(x, y)
            .and_then(|idx| self.bits.get(idx))
            .copied()
            .unwrap_or(false)
    }

    /// Mark a pixel as selected. Coordinates outside the mask are ignored.
    pub fn insert(&mut self, x: u32, y: u32) {
        if let Some(bit) = self.index(x, y).and_then(|idx| self.bits.get_mut(idx)) {
            *bit = true;
        }
    }

    /// Number of selected pixels
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&bit| bit).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&bit| bit)
    }

    /// Iterate over the coordinates of selected pixels in row-major order
    pub fn iter_selected(&self) -> impl Iterator<Item = ImagePoint> + '_ {
        let width = self.width as usize;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &bit)| bit)
            .map(move |(idx, _)| ImagePoint::new((idx % width) as u32, (idx / width) as u32))
    }

    /// Bounding box of the selection, `None` when nothing is selected
    #[must_use]
    pub fn bounds(&self) -> Option<SelectionBounds> {
        let mut points = self.iter_selected();
        let first = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(SelectionBounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    /// Render the mask as a grayscale image (255 = selected, 0 = not selected)
    #[must_use]
    pub fn to_luma_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.contains(x, y) { 255 } else { 0 }])
        })
    }
}
