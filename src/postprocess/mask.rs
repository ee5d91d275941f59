//! Binary alpha masks and silhouettes
//!
//! Masks are `GrayImage`s holding 0 (empty) or 255 (set).

use image::{GrayImage, Luma, RgbaImage};
use imageproc::region_labelling::{connected_components, Connectivity};

pub(crate) const SET: u8 = 255;

/// Mask of pixels whose alpha is strictly above `threshold`
#[must_use]
pub fn alpha_mask(image: &RgbaImage, threshold: u8) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if image.get_pixel(x, y)[3] > threshold {
            Luma([SET])
        } else {
            Luma([0])
        }
    })
}

/// Whether any pixel of the mask is set
#[must_use]
pub fn any_set(mask: &GrayImage) -> bool {
    mask.pixels().any(|p| p[0] != 0)
}

/// Mask with every enclosed hole filled
///
/// Background pixels 4-connected to the image border stay empty; everything
/// else (the foreground plus anything it encloses) becomes set. This is the
/// region bounded by the outer contours of the 8-connected foreground.
#[must_use]
pub fn filled_silhouette(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }

    let background = GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] == 0 {
            Luma([SET])
        } else {
            Luma([0])
        }
    });
    let labels = connected_components(&background, Connectivity::Four, Luma([0u8]));

    let mut exterior = std::collections::HashSet::new();
    for x in 0..width {
        exterior.insert(labels.get_pixel(x, 0)[0]);
        exterior.insert(labels.get_pixel(x, height - 1)[0]);
    }
    for y in 0..height {
        exterior.insert(labels.get_pixel(0, y)[0]);
        exterior.insert(labels.get_pixel(width - 1, y)[0]);
    }
    // Label 0 is foreground and never exterior
    exterior.remove(&0);

    GrayImage::from_fn(width, height, |x, y| {
        if exterior.contains(&labels.get_pixel(x, y)[0]) {
            Luma([0])
        } else {
            Luma([SET])
        }
    })
}

/// Largest 8-connected component of the mask, or `None` for an empty mask
#[must_use]
pub fn largest_component(mask: &GrayImage) -> Option<GrayImage> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut areas: std::collections::HashMap<u32, usize> = std::collections::HashMap::new();
    for label in labels.pixels().map(|p| p[0]).filter(|l| *l != 0) {
        *areas.entry(label).or_insert(0) += 1;
    }
    // Ties resolve to the lowest label, i.e. the first blob in scan order
    let (best, _) = areas
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;

    let (width, height) = mask.dimensions();
    Some(GrayImage::from_fn(width, height, |x, y| {
        if labels.get_pixel(x, y)[0] == best {
            Luma([SET])
        } else {
            Luma([0])
        }
    }))
}
