//! Crop to visible content

use image::imageops;
use image::RgbaImage;

/// Alpha above which a pixel counts as visible content
pub const TRIM_ALPHA_THRESHOLD: u8 = 15;

/// Inclusive bounding box `(x0, y0, x1, y1)` of pixels with alpha above `threshold`
#[must_use]
pub fn content_bounds(image: &RgbaImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let (width, height) = image.dimensions();
    let mut rows = vec![false; height as usize];
    let mut cols = vec![false; width as usize];

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > threshold {
            if let Some(row) = rows.get_mut(y as usize) {
                *row = true;
            }
            if let Some(col) = cols.get_mut(x as usize) {
                *col = true;
            }
        }
    }

    let y0 = rows.iter().position(|r| *r)?;
    let y1 = rows.iter().rposition(|r| *r)?;
    let x0 = cols.iter().position(|c| *c)?;
    let x1 = cols.iter().rposition(|c| *c)?;
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Cropped copy of `image`, or `None` when nothing is visible
#[must_use]
pub fn trim(image: &RgbaImage) -> Option<RgbaImage> {
    let (x0, y0, x1, y1) = content_bounds(image, TRIM_ALPHA_THRESHOLD)?;
    Some(imageops::crop_imm(image, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image())
}
