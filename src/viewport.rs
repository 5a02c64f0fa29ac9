//! Display-region geometry for the presentation layer
//!
//! The presenter shows the image inside a display region. Pointer positions
//! arrive in display coordinates and are mapped back to image pixels with
//! linear scale factors `image_dimension / display_dimension`. Positions that
//! land outside the image are rejected rather than clamped.

use crate::types::ImagePoint;
use image::{imageops::FilterType, RgbImage};
use serde::{Deserialize, Serialize};

/// A pointer position in display-region coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of the region the image is displayed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Map a display position to an image pixel.
    ///
    /// Returns `None` for an empty viewport, negative or non-finite
    /// positions, and positions that scale past the image edge.
    ///
    /// # Examples
    /// ```rust
    /// use bgtouch::{DisplayPoint, ImagePoint, Viewport};
    ///
    /// let viewport = Viewport::new(200, 100);
    /// assert_eq!(
    ///     viewport.map_to_image(DisplayPoint::new(100.0, 50.0), (400, 200)),
    ///     Some(ImagePoint::new(200, 100))
    /// );
    /// assert_eq!(viewport.map_to_image(DisplayPoint::new(200.0, 0.0), (400, 200)), None);
    /// ```
    #[must_use]
    pub fn map_to_image(&self, point: DisplayPoint, image_dims: (u32, u32)) -> Option<ImagePoint> {
        let (image_width, image_height) = image_dims;
        if self.width == 0 || self.height == 0 {
            return None;
        }
        if !point.x.is_finite() || !point.y.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return None;
        }

        let scale_x = f64::from(image_width) / f64::from(self.width);
        let scale_y = f64::from(image_height) / f64::from(self.height);

        let mapped_x = (point.x * scale_x).floor();
        let mapped_y = (point.y * scale_y).floor();

        if mapped_x >= f64::from(image_width) || mapped_y >= f64::from(image_height) {
            return None;
        }

        Some(ImagePoint::new(mapped_x as u32, mapped_y as u32))
    }

    /// Largest size with the image's aspect ratio that fits in the viewport
    #[must_use]
    pub fn fitted_size(&self, image_dims: (u32, u32)) -> (u32, u32) {
        let (image_width, image_height) = image_dims;
        if image_width == 0 || image_height == 0 || self.width == 0 || self.height == 0 {
            return (0, 0);
        }

        let scale = (f64::from(self.width) / f64::from(image_width))
            .min(f64::from(self.height) / f64::from(image_height));

        let width = (f64::from(image_width) * scale).round().max(1.0) as u32;
        let height = (f64::from(image_height) * scale).round().max(1.0) as u32;
        (width.min(self.width), height.min(self.height))
    }

    /// The viewport a presenter should map clicks against after fitting the image
    #[must_use]
    pub fn fitted(&self, image_dims: (u32, u32)) -> Viewport {
        let (width, height) = self.fitted_size(image_dims);
        Viewport::new(width, height)
    }

    /// Scale a frame to fit the viewport while preserving aspect ratio
    #[must_use]
    pub fn fit_frame(&self, frame: &RgbImage) -> RgbImage {
        let (width, height) = self.fitted_size(frame.dimensions());
        if (width, height) == frame.dimensions() || width == 0 || height == 0 {
            return frame.clone();
        }
        image::imageops::resize(frame, width, height, FilterType::Triangle)
    }
}
