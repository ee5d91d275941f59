//! Encoding processed frames into animated containers

use super::frame_file_name;
use crate::config::ToolsConfig;
use crate::error::{FogStripperError, Result};
use crate::services::ImageIOService;
use crate::stages::CommandRunner;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Codec settings for a video container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoCodec {
    pub codec: &'static str,
    pub pixel_format: &'static str,
    /// Whether the codec keeps the alpha channel
    pub preserves_alpha: bool,
    /// Whether width and height must be padded to even numbers
    pub even_dimensions: bool,
}

impl VideoCodec {
    /// Codec for a container extension
    #[must_use]
    pub fn for_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "webm" => Self {
                codec: "libvpx-vp9",
                pixel_format: "yuva420p",
                preserves_alpha: true,
                even_dimensions: false,
            },
            "mov" => Self {
                codec: "qtrle",
                pixel_format: "argb",
                preserves_alpha: true,
                even_dimensions: false,
            },
            _ => Self {
                codec: "libx264",
                pixel_format: "yuv420p",
                preserves_alpha: false,
                even_dimensions: true,
            },
        }
    }
}

/// Encode frames into the container named by `path`'s extension
///
/// # Errors
/// - No frames
/// - The encoder fails
pub fn encode_animation(
    frames: &[RgbaImage],
    fps: f64,
    path: &Path,
    tools: &ToolsConfig,
) -> Result<()> {
    if frames.is_empty() {
        return Err(FogStripperError::animation("no frames to encode"));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if extension == "gif" {
        encode_gif(frames, fps, path)?;
    } else {
        encode_video_cli(frames, fps, path, tools)?;
    }
    info!(frames = frames.len(), fps, "Encoded {}", path.display());
    Ok(())
}

/// Encode a looping GIF
///
/// Each frame is a full canvas disposed to background before the next.
///
/// # Errors
/// - The file cannot be created or encoded
pub fn encode_gif(frames: &[RgbaImage], fps: f64, path: &Path) -> Result<()> {
    let file =
        File::create(path).map_err(|e| FogStripperError::file_io_error("create", path, &e))?;
    let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), 10);
    encoder.set_repeat(Repeat::Infinite)?;

    let delay_ms = (1000.0 / fps).round().max(1.0) as u32;
    let delay = Delay::from_numer_denom_ms(delay_ms, 1);
    encoder.encode_frames(
        frames
            .iter()
            .map(|frame| Frame::from_parts(frame.clone(), 0, 0, delay)),
    )?;
    Ok(())
}

/// Encode a video container with the `ffmpeg` executable
///
/// # Errors
/// - Frames cannot be staged to disk
/// - `ffmpeg` is missing or fails
pub fn encode_video_cli(
    frames: &[RgbaImage],
    fps: f64,
    path: &Path,
    tools: &ToolsConfig,
) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let codec = VideoCodec::for_extension(extension);

    let scratch = tempfile::Builder::new()
        .prefix("fogstripper_encode_")
        .tempdir()?;
    for (i, frame) in frames.iter().enumerate() {
        ImageIOService::save_rgba(frame, scratch.path().join(frame_file_name("in", i, "png")))?;
    }

    let mut args: Vec<Option<OsString>> = vec![
        Some(tools.ffmpeg_program().into_os_string()),
        Some("-y".into()),
        Some("-v".into()),
        Some("error".into()),
        Some("-framerate".into()),
        Some(format!("{:.6}", fps).into()),
        Some("-i".into()),
        Some(scratch.path().join("in_%04d.png").into_os_string()),
        Some("-c:v".into()),
        Some(codec.codec.into()),
        Some("-pix_fmt".into()),
        Some(codec.pixel_format.into()),
    ];
    if codec.even_dimensions {
        args.push(Some("-vf".into()));
        args.push(Some("pad=ceil(iw/2)*2:ceil(ih/2)*2".into()));
    }
    if codec.codec == "libvpx-vp9" {
        // Alt-ref frames drop the alpha plane
        args.push(Some("-auto-alt-ref".into()));
        args.push(Some("0".into()));
    }
    args.push(Some(path.as_os_str().to_owned()));

    let output = CommandRunner::new()
        .execute(&args)
        .map_err(|e| FogStripperError::animation(format!("Failed to run ffmpeg: {}", e)))?;
    if !output.success() {
        return Err(FogStripperError::animation(format!(
            "ffmpeg could not encode {}: {}",
            path.display(),
            output.stderr.trim()
        )));
    }
    Ok(())
}
