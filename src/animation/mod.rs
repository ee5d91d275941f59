//! Animated containers
//!
//! An animation job decodes its input into a [`FrameSequence`], runs every
//! frame through background removal and encodes the result again. GIFs are
//! handled in-process with the `image` crate; video containers go through
//! the `ffmpeg`/`ffprobe` executables, or through `ffmpeg-next` when the
//! `video-support` feature is enabled.

pub mod decode;
pub mod encode;
#[cfg(feature = "video-support")]
pub mod ffmpeg;

pub use decode::decode_animation;
pub use encode::{encode_animation, VideoCodec};

use crate::error::{FogStripperError, Result};
use image::RgbaImage;

/// Frame duration assumed when a container carries no timing metadata
pub const DEFAULT_FRAME_DURATION_MS: f64 = 100.0;

/// Frames per second from explicit fps, else a per-frame duration, else the fallback
#[must_use]
pub fn fps_from_metadata(explicit_fps: Option<f64>, frame_duration_ms: Option<f64>) -> f64 {
    let valid = |v: &f64| v.is_finite() && *v > 0.0;
    explicit_fps
        .filter(valid)
        .unwrap_or_else(|| 1000.0 / frame_duration_ms.filter(valid).unwrap_or(DEFAULT_FRAME_DURATION_MS))
}

/// Name of the `index`th frame file (`frame_0007.png`)
#[must_use]
pub fn frame_file_name(prefix: &str, index: usize, extension: &str) -> String {
    format!("{}_{:04}.{}", prefix, index, extension.trim_start_matches('.'))
}

/// Ordered frames plus their playback rate
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<RgbaImage>,
    fps: f64,
}

impl FrameSequence {
    /// Create a sequence; an empty frame list is an error
    ///
    /// # Errors
    /// - No frames
    pub fn new(frames: Vec<RgbaImage>, fps: f64) -> Result<Self> {
        if frames.is_empty() {
            return Err(FogStripperError::animation("animation contains no frames"));
        }
        Ok(Self {
            frames,
            fps: fps_from_metadata(Some(fps), None),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Display time of one frame in milliseconds
    #[must_use]
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.fps
    }

    #[must_use]
    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }

    #[must_use]
    pub fn into_frames(self) -> Vec<RgbaImage> {
        self.frames
    }
}
