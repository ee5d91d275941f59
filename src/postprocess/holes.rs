//! Interior hole filling
//!
//! Background-removal models sometimes cut through glass, jewelry or other
//! reflective parts of a subject. Pixels inside the subject's outer contour
//! that came back (nearly) transparent are restored from the source image.

use super::mask::{alpha_mask, filled_silhouette};
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Alpha below which a pixel inside the silhouette counts as a hole
pub const HOLE_ALPHA_THRESHOLD: u8 = 10;

/// Refill holes in `current` from `original`, returning the number of pixels restored
///
/// `original` is resized to `current`'s dimensions when they differ.
pub fn fill_holes(current: &mut RgbaImage, original: &RgbaImage) -> usize {
    let (width, height) = current.dimensions();
    let silhouette = filled_silhouette(&alpha_mask(current, 0));

    let resized;
    let source = if original.dimensions() == (width, height) {
        original
    } else {
        resized = imageops::resize(original, width, height, FilterType::Triangle);
        &resized
    };

    let mut restored = 0;
    for (x, y, pixel) in current.enumerate_pixels_mut() {
        if silhouette.get_pixel(x, y)[0] != 0 && pixel[3] < HOLE_ALPHA_THRESHOLD {
            let src = source.get_pixel(x, y);
            *pixel = image::Rgba([src[0], src[1], src[2], 255]);
            restored += 1;
        }
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// 9x9 opaque red square with a transparent 3x3 hole in the middle
    fn donut() -> RgbaImage {
        let mut image = RgbaImage::new(11, 11);
        for y in 1..10 {
            for x in 1..10 {
                image.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        for y in 4..7 {
            for x in 4..7 {
                image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        image
    }

    #[test]
    fn test_fills_hole_from_original() {
        let mut current = donut();
        let original = RgbaImage::from_pixel(11, 11, Rgba([0, 0, 255, 255]));

        assert_eq!(fill_holes(&mut current, &original), 9);
        assert_eq!(*current.get_pixel(5, 5), Rgba([0, 0, 255, 255]));
        // Outside the silhouette nothing changes
        assert_eq!(*current.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        // The subject itself keeps its pixels
        assert_eq!(*current.get_pixel(2, 2), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_is_idempotent() {
        let original = RgbaImage::from_pixel(11, 11, Rgba([0, 255, 0, 255]));
        let mut once = donut();
        fill_holes(&mut once, &original);

        let mut twice = once.clone();
        assert_eq!(fill_holes(&mut twice, &original), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_resizes_original() {
        let mut current = donut();
        let original = RgbaImage::from_pixel(22, 22, Rgba([9, 9, 9, 255]));

        assert_eq!(fill_holes(&mut current, &original), 9);
        assert_eq!(*current.get_pixel(5, 5), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn test_transparent_image_has_no_holes() {
        let mut current = RgbaImage::new(5, 5);
        let original = RgbaImage::from_pixel(5, 5, Rgba([1, 1, 1, 255]));
        assert_eq!(fill_holes(&mut current, &original), 0);
        assert_eq!(current, RgbaImage::new(5, 5));
    }
}
