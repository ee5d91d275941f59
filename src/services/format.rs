//! Raster format selection and conversion
//!
//! Maps output extensions to `image` encoders and adapts RGBA pipeline
//! rasters to what each encoder can hold.

use crate::error::{FogStripperError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::Path;

/// Service for choosing encoders and converting pipeline rasters
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encoder for a bare or dotted extension (`png`, `.jpg`)
    ///
    /// # Errors
    /// - Extension has no raster encoder
    pub fn image_format_for_extension(extension: &str) -> Result<ImageFormat> {
        match extension
            .trim_start_matches('.')
            .to_ascii_lowercase()
            .as_str()
        {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::WebP),
            "bmp" => Ok(ImageFormat::Bmp),
            "tif" | "tiff" => Ok(ImageFormat::Tiff),
            other => Err(FogStripperError::unsupported_format(format!(
                "no raster encoder for '.{}'",
                other
            ))),
        }
    }

    /// Encoder for the extension of `path`
    ///
    /// # Errors
    /// - Path has no extension or no raster encoder
    pub fn image_format_for_path(path: &Path) -> Result<ImageFormat> {
        let extension = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            FogStripperError::unsupported_format(format!(
                "'{}' has no file extension",
                path.display()
            ))
        })?;
        Self::image_format_for_extension(extension)
    }

    /// Whether the encoder keeps an alpha channel
    #[must_use]
    pub fn supports_transparency(format: ImageFormat) -> bool {
        !matches!(format, ImageFormat::Jpeg)
    }

    /// Convert an RGBA raster into something `format` can encode
    ///
    /// JPEG drops alpha; everything else keeps RGBA.
    #[must_use]
    pub fn convert_for_format(rgba_image: RgbaImage, format: ImageFormat) -> DynamicImage {
        let image = DynamicImage::ImageRgba8(rgba_image);
        if Self::supports_transparency(format) {
            image
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
    }
}
