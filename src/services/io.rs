//! Image file input/output
//!
//! Keeps file handling out of the pixel algorithms so they can be tested on
//! in-memory buffers.

use crate::error::{FogStripperError, Result};
use crate::services::format::OutputFormatHandler;
use image::{DynamicImage, RgbaImage};
use std::path::Path;

/// Service for loading and saving pipeline rasters
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image, falling back to content sniffing when the extension lies
    ///
    /// # Errors
    /// - File missing or unreadable
    /// - Neither the extension nor the content identify a decodable image
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(FogStripperError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );
                let data = std::fs::read(path_ref)
                    .map_err(|io_err| FogStripperError::file_io_error("read image data", path_ref, &io_err))?;
                image::load_from_memory(&data)
                    .map_err(|content_err| FogStripperError::image_load_error(path_ref, &content_err))
            },
        }
    }

    /// Load an image as 8-bit RGBA
    ///
    /// # Errors
    /// - See [`ImageIOService::load_image`]
    pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
        Ok(Self::load_image(path)?.to_rgba8())
    }

    /// Save an RGBA raster, choosing the encoder from the path extension
    ///
    /// # Errors
    /// - Extension has no raster encoder
    /// - Parent directory cannot be created
    /// - Encoding or writing fails
    pub fn save_rgba<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let format = OutputFormatHandler::image_format_for_path(path_ref)?;

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    FogStripperError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }

        let output = OutputFormatHandler::convert_for_format(image.clone(), format);
        output.save_with_format(path_ref, format).map_err(|e| {
            FogStripperError::processing(format!(
                "Failed to save {} as {:?}: {}",
                path_ref.display(),
                format,
                e
            ))
        })
    }

    /// Whether a file decodes to an image carrying an alpha channel
    ///
    /// # Errors
    /// - See [`ImageIOService::load_image`]
    pub fn has_alpha_channel<P: AsRef<Path>>(path: P) -> Result<bool> {
        Ok(Self::load_image(path)?.color().has_alpha())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_save_and_load_png_keeps_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 0]));
        img.put_pixel(1, 1, Rgba([200, 100, 50, 255]));

        ImageIOService::save_rgba(&img, &path).unwrap();
        let loaded = ImageIOService::load_rgba(&path).unwrap();
        assert_eq!(loaded, img);
        assert!(ImageIOService::has_alpha_channel(&path).unwrap());
    }

    #[test]
    fn test_save_jpeg_has_no_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 128]));

        ImageIOService::save_rgba(&img, &path).unwrap();
        assert!(!ImageIOService::has_alpha_channel(&path).unwrap());
    }

    #[test]
    fn test_content_sniffing_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.png");
        let lying = dir.path().join("lying.jpg");
        ImageIOService::save_rgba(&RgbaImage::new(2, 2), &real).unwrap();
        std::fs::copy(&real, &lying).unwrap();

        let loaded = ImageIOService::load_rgba(&lying).unwrap();
        assert_eq!(loaded.dimensions(), (2, 2));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageIOService::load_image(dir.path().join("missing.png")).is_err());
    }
}
