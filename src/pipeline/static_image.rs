//! Static image pipeline
//!
//! background removal → hole fill or noise removal → trim → upscale →
//! shadow → background composite → export

use super::{PipelineArtifact, PipelineContext};
use crate::animation::{encode_animation, DEFAULT_FRAME_DURATION_MS};
use crate::config::ToolsConfig;
use crate::error::Result;
use crate::job::{CropOption, FormatKind, HoleStrategy};
use crate::postprocess::{fill_internal_holes, remove_external_noise, trim_to_content};
use crate::services::{ImageIOService, ProgressTracker};
use crate::stages::{StageKind, StageParams};
use crate::utils::move_file;
use crate::vectorize::Vectorizer;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub(crate) const REMBG_ARTIFACT: &str = "1_rembg.png";
pub(crate) const UPSCALE_ARTIFACT: &str = "2_upscaled.png";
pub(crate) const SHADOW_ARTIFACT: &str = "3_shadow.png";
pub(crate) const BACKGROUND_ARTIFACT_STEM: &str = "4_background";

/// Run the static pipeline and return the final output path
///
/// # Errors
/// - Any external stage fails
/// - The export cannot be written
#[instrument(skip_all, fields(job = %ctx.job.id()))]
pub fn run_static(ctx: &PipelineContext<'_>, tracker: &mut ProgressTracker) -> Result<PathBuf> {
    let job = ctx.job;
    let post = job.post_processing();
    let source = PipelineArtifact::source(ctx.source);

    tracker.progress(10);
    let mut current = ctx.run_stage(
        StageKind::BackgroundRemoval,
        &source,
        ctx.artifact_path(REMBG_ARTIFACT),
        &StageParams::background_removal(job),
    )?;
    tracker.progress(30);

    // Cleanup failures are logged by the algorithms and never abort the job
    match post.hole_strategy {
        HoleStrategy::FillHoles => {
            fill_internal_holes(&current.path, ctx.source);
        },
        HoleStrategy::RemoveNoise => {
            remove_external_noise(&current.path);
        },
    }
    if post.crop == CropOption::Trim {
        trim_to_content(&current.path);
    }

    if job.upscale().is_enabled() {
        current = ctx.run_stage(
            StageKind::Upscale,
            &current,
            ctx.artifact_path(UPSCALE_ARTIFACT),
            &StageParams::upscale(job),
        )?;
    }
    tracker.progress(50);

    if post.enabled {
        if post.shadow.enabled {
            current = ctx.run_stage(
                StageKind::Shadow,
                &current,
                ctx.artifact_path(SHADOW_ARTIFACT),
                &StageParams::Shadow,
            )?;
        }
        tracker.progress(70);

        if let Some(background) = &post.background {
            // The compositor writes a raster; vector output is traced from it afterwards
            let extension = match job.output_format().kind() {
                FormatKind::Raster => job.output_format().extension(),
                FormatKind::Vector | FormatKind::AnimatedContainer => ".png",
            };
            current = ctx.run_stage(
                StageKind::BackgroundComposite,
                &current,
                ctx.artifact_path(&format!("{}{}", BACKGROUND_ARTIFACT_STEM, extension)),
                &StageParams::background_composite(background),
            )?;
        }
        tracker.progress(90);
    }

    let output = export(
        &current.path,
        &job.final_output_path(),
        job.output_format().kind(),
        ctx.vectorizer,
        ctx.tools,
    )?;
    tracker.progress(100);
    Ok(output)
}

/// Write `artifact` to `destination` in the format its extension names
///
/// Vector exports that fail fall back to a PNG next to the requested path.
pub(crate) fn export(
    artifact: &Path,
    destination: &Path,
    kind: FormatKind,
    vectorizer: &dyn Vectorizer,
    tools: &ToolsConfig,
) -> Result<PathBuf> {
    match kind {
        FormatKind::Vector => {
            if vectorizer.vectorize(artifact, destination) {
                return Ok(destination.to_path_buf());
            }
            let fallback = destination.with_extension("png");
            warn!(
                fallback = %fallback.display(),
                "Vector export failed, saving as PNG instead"
            );
            export_raster(artifact, &fallback)?;
            Ok(fallback)
        },
        FormatKind::Raster => {
            export_raster(artifact, destination)?;
            Ok(destination.to_path_buf())
        },
        FormatKind::AnimatedContainer => {
            let frame = ImageIOService::load_rgba(artifact)?;
            encode_animation(
                &[frame],
                1000.0 / DEFAULT_FRAME_DURATION_MS,
                destination,
                tools,
            )?;
            Ok(destination.to_path_buf())
        },
    }
}

/// Move the artifact when the extension already matches, transcode otherwise
fn export_raster(artifact: &Path, destination: &Path) -> Result<()> {
    let same_extension = match (artifact.extension(), destination.extension()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };

    if same_extension {
        move_file(artifact, destination)?;
    } else {
        let image = ImageIOService::load_rgba(artifact)?;
        ImageIOService::save_rgba(&image, destination)?;
    }
    info!(output = %destination.display(), "Exported");
    Ok(())
}
