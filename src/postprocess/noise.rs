//! External noise removal (keep the largest blob)

use super::mask::{alpha_mask, any_set, filled_silhouette, largest_component};
use image::RgbaImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, open};

/// Alpha above which a pixel belongs to the binary subject mask
pub const NOISE_ALPHA_THRESHOLD: u8 = 10;

/// Radius of the 5x5 opening that severs thin bridges
const OPEN_RADIUS: u8 = 2;

/// Radius of the 7x7 dilation that restores edges eaten by the opening
const DILATE_RADIUS: u8 = 3;

/// What noise removal did to the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseRemoval {
    /// Nothing visible to clean; image untouched
    Skipped,
    /// Kept the largest blob of the opened mask
    Opened,
    /// Opening erased everything; kept the largest blob of any visible alpha
    RawFallback,
}

/// Keep only the largest opaque region of `image`, clearing alpha elsewhere
pub fn remove_noise(image: &mut RgbaImage) -> NoiseRemoval {
    let raw = alpha_mask(image, 0);
    if !any_set(&raw) {
        return NoiseRemoval::Skipped;
    }

    // Faint-only images leave this empty and go straight to the raw fallback
    let mask = alpha_mask(image, NOISE_ALPHA_THRESHOLD);
    let opened = open(&mask, Norm::LInf, OPEN_RADIUS);
    let (keep, outcome) = match largest_component(&opened) {
        Some(blob) => (
            dilate(&filled_silhouette(&blob), Norm::LInf, DILATE_RADIUS),
            NoiseRemoval::Opened,
        ),
        None => match largest_component(&raw) {
            Some(blob) => (filled_silhouette(&blob), NoiseRemoval::RawFallback),
            None => return NoiseRemoval::Skipped,
        },
    };

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if keep.get_pixel(x, y)[0] == 0 {
            pixel[3] = 0;
        }
    }
    outcome
}
