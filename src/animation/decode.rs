//! Decoding animated inputs into frame sequences

use super::{fps_from_metadata, FrameSequence};
use crate::config::ToolsConfig;
use crate::error::{FogStripperError, Result};
use crate::services::ImageIOService;
use crate::stages::{CommandOutput, CommandRunner};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Decode any supported animated input
///
/// # Errors
/// - The container cannot be opened or decoded
/// - The container holds no frames
pub fn decode_animation(path: &Path, tools: &ToolsConfig) -> Result<FrameSequence> {
    let is_gif = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"));

    let sequence = if is_gif {
        decode_gif(path)?
    } else {
        decode_video(path, tools)?
    };

    info!(
        frames = sequence.len(),
        fps = sequence.fps(),
        "Decoded {}",
        path.display()
    );
    Ok(sequence)
}

#[cfg(feature = "video-support")]
fn decode_video(path: &Path, _tools: &ToolsConfig) -> Result<FrameSequence> {
    super::ffmpeg::decode_video(path)
}

#[cfg(not(feature = "video-support"))]
fn decode_video(path: &Path, tools: &ToolsConfig) -> Result<FrameSequence> {
    decode_video_cli(path, tools)
}

/// Decode a GIF with the `image` crate
///
/// The frame rate comes from the first frame's delay.
///
/// # Errors
/// - The file cannot be opened or decoded
pub fn decode_gif(path: &Path) -> Result<FrameSequence> {
    let file = File::open(path).map_err(|e| FogStripperError::file_io_error("open", path, &e))?;
    let decoder = GifDecoder::new(BufReader::new(file))?;
    let frames = decoder.into_frames().collect_frames()?;

    let delay_ms = frames.first().map(|frame| {
        let (numer, denom) = frame.delay().numer_denom_ms();
        f64::from(numer) / f64::from(denom.max(1))
    });
    let fps = fps_from_metadata(None, delay_ms);
    debug!(?delay_ms, fps, "GIF timing");

    FrameSequence::new(frames.into_iter().map(image::Frame::into_buffer).collect(), fps)
}

/// Decode a video container by shelling out to `ffprobe` and `ffmpeg`
///
/// # Errors
/// - `ffmpeg` fails or produces no frames
pub fn decode_video_cli(path: &Path, tools: &ToolsConfig) -> Result<FrameSequence> {
    let runner = CommandRunner::new();
    let fps = probe_frame_rate(&runner, &tools.ffprobe_program(), path);

    let scratch = tempfile::Builder::new()
        .prefix("fogstripper_decode_")
        .tempdir()?;
    let pattern = scratch.path().join("src_%06d.png");

    let args: Vec<Option<OsString>> = vec![
        Some(tools.ffmpeg_program().into_os_string()),
        Some("-v".into()),
        Some("error".into()),
        Some("-i".into()),
        Some(path.as_os_str().to_owned()),
        Some("-vsync".into()),
        Some("0".into()),
        Some(pattern.into_os_string()),
    ];
    let output = runner
        .execute(&args)
        .map_err(|e| FogStripperError::animation(format!("Failed to run ffmpeg: {}", e)))?;
    if !output.success() {
        return Err(FogStripperError::animation(format!(
            "ffmpeg could not decode {}: {}",
            path.display(),
            output.stderr.trim()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(scratch.path())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "png"))
        .collect();
    files.sort();

    let frames = files
        .iter()
        .map(ImageIOService::load_rgba)
        .collect::<Result<Vec<_>>>()?;
    FrameSequence::new(frames, fps)
}

/// Frame rate reported by `ffprobe`, or the fallback when probing fails
fn probe_frame_rate(runner: &CommandRunner, ffprobe: &Path, path: &Path) -> f64 {
    let args: Vec<Option<OsString>> = vec![
        Some(ffprobe.as_os_str().to_owned()),
        Some("-v".into()),
        Some("error".into()),
        Some("-select_streams".into()),
        Some("v:0".into()),
        Some("-show_entries".into()),
        Some("stream=r_frame_rate".into()),
        Some("-of".into()),
        Some("default=noprint_wrappers=1:nokey=1".into()),
        Some(path.as_os_str().to_owned()),
    ];

    let explicit = runner
        .execute(&args)
        .ok()
        .filter(CommandOutput::success)
        .and_then(|out| parse_frame_rate(out.stdout.trim()));
    fps_from_metadata(explicit, None)
}

/// Parse an ffprobe rate such as `30000/1001` or `25`
#[must_use]
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.lines().next()?.trim();
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        },
        None => raw.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::encode::encode_gif;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("25/1").unwrap() - 25.0).abs() < 1e-9);
        assert!((parse_frame_rate("30000/1001\n").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("12").unwrap() - 12.0).abs() < 1e-9);
        assert!(parse_frame_rate("0/0").is_none());
        assert!(parse_frame_rate("N/A").is_none());
        assert!(parse_frame_rate("").is_none());
    }

    #[test]
    fn test_decode_gif_frames_and_fps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        let frames: Vec<RgbaImage> = (0..4u8)
            .map(|i| RgbaImage::from_pixel(6, 4, Rgba([i * 60, 0, 0, 255])))
            .collect();
        encode_gif(&frames, 20.0, &path).unwrap();

        let sequence = decode_gif(&path).unwrap();
        assert_eq!(sequence.len(), 4);
        assert_eq!(sequence.frames()[0].dimensions(), (6, 4));
        assert!((sequence.fps() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(decode_animation(&dir.path().join("missing.gif"), &ToolsConfig::default()).is_err());
    }
}
