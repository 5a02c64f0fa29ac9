//! Pixel operations driven by a selection mask

use crate::types::SelectionMask;
use image::{Rgb, RgbImage};

/// Copy `image` with every selected pixel recolored to `highlight`.
///
/// Display-only: the source image is left untouched.
#[must_use]
pub fn render_overlay(image: &RgbImage, mask: &SelectionMask, highlight: [u8; 3]) -> RgbImage {
    let mut preview = image.clone();
    paint(&mut preview, mask, highlight);
    preview
}

/// Overwrite every selected pixel of `image` with `fill`, returning the number of pixels written.
pub fn apply_fill(image: &mut RgbImage, mask: &SelectionMask, fill: [u8; 3]) -> usize {
    paint(image, mask, fill)
}

fn paint(image: &mut RgbImage, mask: &SelectionMask, color: [u8; 3]) -> usize {
    if image.dimensions() != mask.dimensions() {
        log::warn!(
            "Mask {:?} does not match image {:?}; nothing painted",
            mask.dimensions(),
            image.dimensions()
        );
        return 0;
    }

    let mut painted = 0;
    for point in mask.iter_selected() {
        image.put_pixel(point.x, point.y, Rgb(color));
        painted += 1;
    }
    painted
}
