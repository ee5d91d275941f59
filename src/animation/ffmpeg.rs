//! In-process video decoding with `ffmpeg-next`

use super::{fps_from_metadata, FrameSequence};
use crate::error::{FogStripperError, Result};
use ffmpeg_next as ffmpeg;
use image::RgbaImage;
use std::path::Path;

/// Decode every frame of the best video stream in `path`
///
/// # Errors
/// - FFmpeg cannot be initialized
/// - The file has no decodable video stream
pub fn decode_video(path: &Path) -> Result<FrameSequence> {
    ffmpeg::init()
        .map_err(|e| FogStripperError::animation(format!("Failed to initialize FFmpeg: {}", e)))?;

    let mut input = ffmpeg::format::input(path).map_err(|e| {
        FogStripperError::animation(format!(
            "Failed to open video file {}: {}",
            path.display(),
            e
        ))
    })?;

    let (stream_index, explicit_fps, parameters) = {
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| FogStripperError::animation("No video stream found in file"))?;
        let rate = stream.avg_frame_rate();
        let fps = (rate.denominator() != 0).then(|| f64::from(rate));
        (stream.index(), fps, stream.parameters())
    };

    let context = ffmpeg::codec::context::Context::from_parameters(parameters).map_err(|e| {
        FogStripperError::animation(format!("Failed to create codec context: {}", e))
    })?;
    let mut decoder = context.decoder().video().map_err(|e| {
        FogStripperError::animation(format!("Failed to create video decoder: {}", e))
    })?;

    let mut frames = Vec::new();
    let mut decoded = ffmpeg::util::frame::video::Video::empty();

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if let Err(e) = decoder.send_packet(&packet) {
            log::error!("Failed to send packet to decoder: {}", e);
            continue;
        }
        while decoder.receive_frame(&mut decoded).is_ok() {
            frames.push(to_rgba(&decoded)?);
        }
    }

    decoder.send_eof().ok();
    while decoder.receive_frame(&mut decoded).is_ok() {
        frames.push(to_rgba(&decoded)?);
    }

    log::info!("Extracted {} frames from {}", frames.len(), path.display());
    FrameSequence::new(frames, fps_from_metadata(explicit_fps, None))
}

fn to_rgba(frame: &ffmpeg::util::frame::video::Video) -> Result<RgbaImage> {
    let width = frame.width();
    let height = frame.height();

    let mut scaler = ffmpeg::software::scaling::Context::get(
        frame.format(),
        width,
        height,
        ffmpeg::format::Pixel::RGBA,
        width,
        height,
        ffmpeg::software::scaling::Flags::BILINEAR,
    )
    .map_err(|e| FogStripperError::animation(format!("Failed to create frame scaler: {}", e)))?;

    let mut rgba_frame = ffmpeg::util::frame::video::Video::empty();
    scaler.run(frame, &mut rgba_frame).map_err(|e| {
        FogStripperError::animation(format!("Failed to convert frame to RGBA: {}", e))
    })?;

    let data = rgba_frame.data(0);
    let stride = rgba_frame.stride(0);
    let row_bytes = width as usize * 4;

    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        let row = data
            .get(start..start + row_bytes)
            .ok_or_else(|| FogStripperError::animation("Decoded frame is shorter than expected"))?;
        buffer.extend_from_slice(row);
    }

    RgbaImage::from_raw(width, height, buffer)
        .ok_or_else(|| FogStripperError::animation("Decoded frame has inconsistent dimensions"))
}
