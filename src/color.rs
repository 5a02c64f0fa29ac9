//! Perceptual color representation (CIE L\*a\*b\*, D65)
//!
//! Lab values are stored in the common 8-bit encoding: `L` is scaled from
//! `0..=100` to `0..=255`, `a` and `b` are offset by 128. Distances between
//! two encoded values are computed on signed integers so that differences
//! across the 128 offset never wrap.

use image::RgbImage;
use std::sync::OnceLock;

/// D65 reference white
const WHITE_X: f32 = 0.950_456;
const WHITE_Z: f32 = 1.088_754;

/// CIE epsilon and kappa-derived linear segment
const EPSILON: f32 = 0.008_856;
const LINEAR_SLOPE: f32 = 7.787;
const LINEAR_OFFSET: f32 = 16.0 / 116.0;

/// A Lab color in 8-bit encoding: `[L, a + 128, b + 128]`
pub type Lab8 = [u8; 3];

fn srgb_to_linear_table() -> &'static [f32; 256] {
    static TABLE: OnceLock<[f32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0f32; 256];
        for (value, slot) in table.iter_mut().enumerate() {
            let c = value as f32 / 255.0;
            *slot = if c > 0.040_45 {
                ((c + 0.055) / 1.055).powf(2.4)
            } else {
                c / 12.92
            };
        }
        table
    })
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        LINEAR_SLOPE * t + LINEAR_OFFSET
    }
}

/// Convert one sRGB pixel to 8-bit encoded Lab
#[must_use]
pub fn rgb_to_lab8(rgb: [u8; 3]) -> Lab8 {
    let table = srgb_to_linear_table();
    let r = table[usize::from(rgb[0])];
    let g = table[usize::from(rgb[1])];
    let b = table[usize::from(rgb[2])];

    // Linear sRGB to XYZ (D65)
    let x = (r * 0.412_453 + g * 0.357_580 + b * 0.180_423) / WHITE_X;
    let y = r * 0.212_671 + g * 0.715_160 + b * 0.072_169;
    let z = (r * 0.019_334 + g * 0.119_193 + b * 0.950_227) / WHITE_Z;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    let l = if y > EPSILON { 116.0 * fy - 16.0 } else { 903.3 * y };
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    [
        encode_channel(l * 255.0 / 100.0),
        encode_channel(a + 128.0),
        encode_channel(b + 128.0),
    ]
}

#[inline]
fn encode_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Euclidean distance between two encoded Lab colors
#[must_use]
pub fn lab_distance(a: Lab8, b: Lab8) -> f32 {
    let squared: i32 = a
        .iter()
        .zip(b.iter())
        .map(|(&p, &q)| {
            let d = i32::from(p) - i32::from(q);
            d * d
        })
        .sum();
    (squared as f32).sqrt()
}

/// Per-pixel Lab representation of an RGB image
///
/// Built once from an image and never mutated; whoever replaces the image
/// must rebuild this representation alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabImage {
    width: u32,
    height: u32,
    pixels: Vec<Lab8>,
}

impl LabImage {
    /// Convert an RGB image to its Lab representation
    #[must_use]
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image.pixels().map(|p| rgb_to_lab8(p.0)).collect();
        Self {
            width,
            height,
            pixels,
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

    /// Lab value at `(x, y)`, `None` outside the image
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Lab8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}
