//! In-process pixel post-processing
//!
//! Three algorithms run between stages on the current artifact:
//! interior hole filling, external noise removal and trim to content. The
//! file-level functions rewrite the artifact at the same path and report
//! success as a boolean; callers treat a `false` as a logged, non-fatal
//! outcome and continue with the unmodified artifact.

pub mod holes;
pub mod mask;
pub mod noise;
pub mod trim;

pub use holes::{fill_holes, HOLE_ALPHA_THRESHOLD};
pub use noise::{remove_noise, NoiseRemoval, NOISE_ALPHA_THRESHOLD};
pub use trim::{content_bounds, trim, TRIM_ALPHA_THRESHOLD};

use crate::error::Result;
use crate::services::ImageIOService;
use std::path::Path;
use tracing::{debug, info, warn};

/// Restore interior holes of `artifact` from the pre-removal `original`
pub fn fill_internal_holes(artifact: &Path, original: &Path) -> bool {
    match try_fill_internal_holes(artifact, original) {
        Ok(restored) => {
            info!(pixels = restored, "Interior holes filled");
            true
        },
        Err(e) => {
            warn!(artifact = %artifact.display(), "Hole filling failed: {}", e);
            false
        },
    }
}

/// Keep only the largest opaque blob of `artifact`
pub fn remove_external_noise(artifact: &Path) -> bool {
    match try_remove_external_noise(artifact) {
        Ok(NoiseRemoval::Skipped) => {
            debug!("No alpha content, noise removal skipped");
            true
        },
        Ok(NoiseRemoval::RawFallback) => {
            info!("Opening removed everything, kept the largest raw region");
            true
        },
        Ok(NoiseRemoval::Opened) => {
            info!("External noise removed");
            true
        },
        Err(e) => {
            warn!(artifact = %artifact.display(), "Noise removal failed: {}", e);
            false
        },
    }
}

/// Crop `artifact` to the bounding box of its visible pixels
///
/// Returns `false` and leaves the file untouched when the image is fully
/// transparent.
pub fn trim_to_content(artifact: &Path) -> bool {
    match try_trim_to_content(artifact) {
        Ok(true) => true,
        Ok(false) => {
            warn!(artifact = %artifact.display(), "Image is fully transparent, nothing to trim");
            false
        },
        Err(e) => {
            warn!(artifact = %artifact.display(), "Trim failed: {}", e);
            false
        },
    }
}

fn try_fill_internal_holes(artifact: &Path, original: &Path) -> Result<usize> {
    let mut current = ImageIOService::load_rgba(artifact)?;
    let source = ImageIOService::load_rgba(original)?;
    let restored = fill_holes(&mut current, &source);
    if restored > 0 {
        ImageIOService::save_rgba(&current, artifact)?;
    }
    Ok(restored)
}

fn try_remove_external_noise(artifact: &Path) -> Result<NoiseRemoval> {
    if !ImageIOService::has_alpha_channel(artifact)? {
        return Ok(NoiseRemoval::Skipped);
    }
    let mut current = ImageIOService::load_rgba(artifact)?;
    let outcome = remove_noise(&mut current);
    if outcome != NoiseRemoval::Skipped {
        ImageIOService::save_rgba(&current, artifact)?;
    }
    Ok(outcome)
}

fn try_trim_to_content(artifact: &Path) -> Result<bool> {
    let current = ImageIOService::load_rgba(artifact)?;
    let Some(trimmed) = trim(&current) else {
        return Ok(false);
    };
    debug!(
        from = ?current.dimensions(),
        to = ?trimmed.dimensions(),
        "Trimmed to content"
    );
    ImageIOService::save_rgba(&trimmed, artifact)?;
    Ok(true)
}
