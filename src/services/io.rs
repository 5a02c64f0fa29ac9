//! Image I/O operations service
//!
//! This module separates file I/O operations from editing logic,
//! making the session and batch layers testable without touching disk.

use crate::error::{Result, TouchupError};
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// Extensions accepted as still-image inputs
pub const SUPPORTED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "webp", "bmp", "gif", "tiff", "tif"];

/// A decoded image together with the format it was stored in
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// # Arguments
    /// * `path` - Path to the image file
    ///
    /// # Returns
    /// * `Ok(DynamicImage)` - Successfully loaded image
    /// * `Err(TouchupError)` - Missing file or undecodable content
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgtouch::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("input.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        Self::load_with_format(path).map(|decoded| decoded.image)
    }

    /// Load an image and report the format it was decoded from
    ///
    /// Extension-based decoding is tried first; when it fails the file
    /// content is sniffed instead, so mislabelled files still open.
    pub fn load_with_format<P: AsRef<Path>>(path: P) -> Result<DecodedImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(TouchupError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let data = std::fs::read(path_ref)
            .map_err(|e| TouchupError::file_io_error("read image data", path_ref, &e))?;

        let by_extension = ImageFormat::from_path(path_ref).ok();
        if let Some(format) = by_extension {
            match image::load_from_memory_with_format(&data, format) {
                Ok(image) => {
                    return Ok(DecodedImage {
                        image,
                        format: Some(format),
                    })
                },
                Err(e) => log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                ),
            }
        }

        let sniffed = image::guess_format(&data).map_err(|e| TouchupError::image_load_error(path_ref, &e))?;
        image::load_from_memory_with_format(&data, sniffed)
            .map(|image| DecodedImage {
                image,
                format: Some(sniffed),
            })
            .map_err(|e| TouchupError::image_load_error(path_ref, &e))
    }

    /// Load an image from bytes
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| {
            TouchupError::processing(format!("Failed to decode image from bytes: {}", e))
        })
    }

    /// Save an image, choosing the format from the path extension
    ///
    /// # Arguments
    /// * `image` - The image to save
    /// * `path` - Output file path; parent directories are created
    /// * `fallback_format` - Format used when the extension is missing or unknown,
    ///   typically the format the image was loaded from
    ///
    /// # Errors
    /// - No format could be determined
    /// - Directory creation or encoding failures
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgtouch::services::ImageIOService;
    /// use image::{DynamicImage, ImageFormat};
    ///
    /// # let image = DynamicImage::new_rgb8(100, 100);
    /// ImageIOService::save_image(&image, "output.png", Some(ImageFormat::Png))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn save_image<P: AsRef<Path>>(
        image: &DynamicImage,
        path: P,
        fallback_format: Option<ImageFormat>,
    ) -> Result<ImageFormat> {
        let path_ref = path.as_ref();

        let format = ImageFormat::from_path(path_ref)
            .ok()
            .or(fallback_format)
            .ok_or_else(|| {
                TouchupError::processing_stage_error(
                    "image save",
                    "cannot determine output format from path",
                    Some(&format!("path: {}", path_ref.display())),
                )
            })?;

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TouchupError::file_io_error("create output directory", parent, &e)
            })?;
        }

        // JPEG and BMP encoders reject alpha
        let encodable = match format {
            ImageFormat::Jpeg | ImageFormat::Bmp if image.color().has_alpha() => {
                DynamicImage::ImageRgb8(image.to_rgb8())
            },
            _ => image.clone(),
        };

        encodable.save_with_format(path_ref, format).map_err(|e| {
            TouchupError::processing_stage_error(
                "image save",
                &format!("Failed to save as {:?}: {}", format, e),
                Some(&format!("format: {:?}, path: {}", format, path_ref.display())),
            )
        })?;

        log::debug!("Saved {:?} image to {}", format, path_ref.display());
        Ok(format)
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use tempfile::tempdir;

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 7])))
    }

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("test.jpg"));
        assert!(ImageIOService::is_supported_format("test.JPEG"));
        assert!(ImageIOService::is_supported_format("test.png"));
        assert!(ImageIOService::is_supported_format("test.bmp"));
        assert!(ImageIOService::is_supported_format("test.gif"));
        assert!(ImageIOService::is_supported_format("dir/test.tif"));

        assert!(!ImageIOService::is_supported_format("test.txt"));
        assert!(!ImageIOService::is_supported_format("test"));
        assert!(!ImageIOService::is_supported_format(""));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ImageIOService::load_image("/nonexistent/rack.png");
        assert!(matches!(result, Err(TouchupError::Io(_))));
    }

    #[test]
    fn test_load_undecodable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let result = ImageIOService::load_image(&path);
        assert!(matches!(result, Err(TouchupError::Image(_))));
    }

    #[test]
    fn test_save_and_load_round_trip_keeps_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");

        let format = ImageIOService::save_image(&sample(), &path, None).unwrap();
        assert_eq!(format, ImageFormat::Png);

        let decoded = ImageIOService::load_with_format(&path).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert_eq!(decoded.image.to_rgb8(), sample().to_rgb8());
    }

    #[test]
    fn test_mislabelled_file_is_sniffed() {
        let dir = tempdir().unwrap();
        let png_path = dir.path().join("real.png");
        ImageIOService::save_image(&sample(), &png_path, None).unwrap();

        let fake_jpg = dir.path().join("actually_png.jpg");
        std::fs::copy(&png_path, &fake_jpg).unwrap();

        let decoded = ImageIOService::load_with_format(&fake_jpg).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert_eq!(decoded.image.dimensions(), (4, 3));
    }

    #[test]
    fn test_save_uses_fallback_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_extension");

        assert!(ImageIOService::save_image(&sample(), &path, None).is_err());

        let format = ImageIOService::save_image(&sample(), &path, Some(ImageFormat::Bmp)).unwrap();
        assert_eq!(format, ImageFormat::Bmp);
        assert!(path.exists());
    }

    #[test]
    fn test_save_jpeg_drops_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let rgba = DynamicImage::new_rgba8(8, 8);

        assert_eq!(
            ImageIOService::save_image(&rgba, &path, None).unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(ImageIOService::load_image(&path).unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn test_load_from_bytes_invalid() {
        assert!(ImageIOService::load_from_bytes(&[]).is_err());
        assert!(ImageIOService::load_from_bytes(b"junk").is_err());
    }
}
