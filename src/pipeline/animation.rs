//! Animation pipeline
//!
//! Decode the container, run background removal on every frame, then write
//! either a directory of per-frame files or a re-encoded container. Upscale,
//! shadow, compositing and trim are not applied per frame.

use super::static_image::export;
use super::{PipelineArtifact, PipelineContext};
use crate::animation::{decode_animation, encode_animation, frame_file_name};
use crate::error::{FogStripperError, Result};
use crate::job::FormatKind;
use crate::services::{ImageIOService, ProgressTracker};
use crate::stages::{StageKind, StageParams};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Share of the progress bar spent on per-frame processing
const FRAME_PROGRESS_CEILING: u8 = 90;

/// Run the animation pipeline and return the output file or directory
///
/// # Errors
/// - The input cannot be decoded
/// - Background removal fails on any frame
/// - The output cannot be written
#[instrument(skip_all, fields(job = %ctx.job.id()))]
pub fn run_animation(ctx: &PipelineContext<'_>, tracker: &mut ProgressTracker) -> Result<PathBuf> {
    let job = ctx.job;
    let sequence = decode_animation(ctx.source, ctx.tools)?;
    let fps = sequence.fps();
    let total = sequence.len();
    let params = StageParams::background_removal(job);

    let mut processed = Vec::with_capacity(total);
    for (i, frame) in sequence.into_frames().into_iter().enumerate() {
        let frame_path = ctx.artifact_path(&frame_file_name("frame", i, "png"));
        ImageIOService::save_rgba(&frame, &frame_path)?;

        let output = ctx
            .run_stage(
                StageKind::BackgroundRemoval,
                &PipelineArtifact::source(&frame_path),
                ctx.artifact_path(&frame_file_name("proc", i, "png")),
                &params,
            )
            .map_err(|e| {
                FogStripperError::stage_failure(
                    StageKind::BackgroundRemoval.name(),
                    format!("frame {} of {}: {}", i, total, e),
                )
            })?;

        processed.push(onto_transparent_canvas(ImageIOService::load_rgba(&output.path)?));
        tracker.fractional(i + 1, total, FRAME_PROGRESS_CEILING);
    }

    let final_path = job.final_output_path();
    let output = match job.output_format().kind() {
        FormatKind::AnimatedContainer => {
            encode_animation(&processed, fps, &final_path, ctx.tools)?;
            final_path
        },
        kind @ (FormatKind::Raster | FormatKind::Vector) => {
            write_frame_directory(ctx, &processed, &final_path, kind)?
        },
    };

    tracker.progress(100);
    Ok(output)
}

/// Save every frame into `<final stem>/frame_NNNN<ext>`
fn write_frame_directory(
    ctx: &PipelineContext<'_>,
    frames: &[RgbaImage],
    final_path: &Path,
    kind: FormatKind,
) -> Result<PathBuf> {
    let output_dir = final_path.with_extension("");
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| FogStripperError::file_io_error("create frame directory", &output_dir, &e))?;

    let extension = ctx.job.output_format().bare_extension();
    for (i, frame) in frames.iter().enumerate() {
        let staged = ctx.artifact_path(&frame_file_name("out", i, "png"));
        ImageIOService::save_rgba(frame, &staged)?;
        let destination = output_dir.join(frame_file_name("frame", i, extension));
        export(&staged, &destination, kind, ctx.vectorizer, ctx.tools)?;
    }

    info!(frames = frames.len(), dir = %output_dir.display(), "Wrote frame sequence");
    Ok(output_dir)
}

/// Copy a frame onto a fully transparent canvas of the same size
///
/// Fully transparent pixels lose whatever color the stage left behind.
#[must_use]
pub fn onto_transparent_canvas(frame: RgbaImage) -> RgbaImage {
    let (width, height) = frame.dimensions();
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for (x, y, pixel) in frame.enumerate_pixels() {
        if pixel[3] > 0 {
            canvas.put_pixel(x, y, *pixel);
        }
    }
    canvas
}
