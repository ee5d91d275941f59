//! Processing job description
//!
//! A [`ProcessingJob`] is one user request: one input file, one output format
//! and the option set that selects which stages run. Jobs are validated when
//! built and immutable afterwards; the orchestrator consumes each job once.

use crate::backup::strip_backup_suffix;
use crate::error::{FogStripperError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Input extensions handled by the animation pipeline
pub const ANIMATED_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "wmv", "mkv", "avchd", "flv", "webm", "m4v", "divx", "gif",
];

/// Still image input extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Raster output extensions the exporter can write
pub const RASTER_OUTPUT_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff"];

/// Vector output extensions
pub const VECTOR_OUTPUT_EXTENSIONS: &[&str] = &["svg"];

/// Upscale factors accepted by the upscaling stage (0 disables upscaling)
pub const VALID_UPSCALE_FACTORS: &[u8] = &[0, 2, 3, 4];

/// Default background-removal model
pub const DEFAULT_MODEL: &str = "u2net";

/// Default edge power passed to the background-removal stage
pub const DEFAULT_EDGE_POWER: u8 = 75;

/// Default upscaler tile size
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// What kind of artifact an output format produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Single raster image
    Raster,
    /// SVG document
    Vector,
    /// Animated container (GIF or a video container)
    AnimatedContainer,
}

/// Output format, normalized to a single lowercase leading-dot extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputFormat {
    extension: String,
}

impl OutputFormat {
    /// Parse and normalize a user supplied format (`png`, `.png`, `PNG`)
    ///
    /// # Errors
    /// - Empty format
    /// - Extension that no exporter can produce
    pub fn parse(raw: &str) -> Result<Self> {
        let bare = raw.trim().trim_start_matches('.').to_ascii_lowercase();
        if bare.is_empty() || bare.contains(['/', '\\', '.']) {
            return Err(FogStripperError::unsupported_format(format!(
                "'{}' is not a file extension",
                raw
            )));
        }

        let known = RASTER_OUTPUT_EXTENSIONS.contains(&bare.as_str())
            || VECTOR_OUTPUT_EXTENSIONS.contains(&bare.as_str())
            || ANIMATED_EXTENSIONS.contains(&bare.as_str());
        if !known {
            return Err(FogStripperError::unsupported_format(format!(
                "output format '.{}'",
                bare
            )));
        }

        Ok(Self {
            extension: format!(".{}", bare),
        })
    }

    /// PNG output
    #[must_use]
    pub fn png() -> Self {
        Self {
            extension: ".png".to_string(),
        }
    }

    /// Extension including the leading dot (`.png`)
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Extension without the leading dot (`png`)
    #[must_use]
    pub fn bare_extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }

    /// Artifact kind this format produces
    #[must_use]
    pub fn kind(&self) -> FormatKind {
        let bare = self.bare_extension();
        if VECTOR_OUTPUT_EXTENSIONS.contains(&bare) {
            FormatKind::Vector
        } else if ANIMATED_EXTENSIONS.contains(&bare) {
            FormatKind::AnimatedContainer
        } else {
            FormatKind::Raster
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension)
    }
}

/// Which alpha cleanup runs right after background removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoleStrategy {
    /// Refill interior holes from the original pixels
    FillHoles,
    /// Keep only the largest opaque blob
    #[default]
    RemoveNoise,
}

/// Geometric crop applied after cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropOption {
    /// Keep the canvas size
    #[default]
    None,
    /// Crop to the bounding box of visible content
    Trim,
}

/// Upscaling stage parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscaleOptions {
    /// Tile size handed to the upscaler
    pub tile_size: u32,
    /// Scale factor; 0 disables the stage
    pub factor: u8,
}

impl UpscaleOptions {
    /// Whether the upscale stage runs
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.factor > 0
    }
}

impl Default for UpscaleOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            factor: 0,
        }
    }
}

/// Drop shadow parameters
///
/// The shadow stage renders with its own blur and opacity; these values are
/// recorded with the job but not forwarded as flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowOptions {
    pub enabled: bool,
    pub blur: u32,
    pub opacity: u8,
}

impl Default for ShadowOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            blur: 15,
            opacity: 180,
        }
    }
}

/// Background source for the compositing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundType {
    /// Solid color, data is a hex code
    Color,
    /// Image file, data is a path
    Image,
}

impl BackgroundType {
    /// Value of the `--bg-type` flag
    #[must_use]
    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Image => "image",
        }
    }
}

/// How foreground and background sizes are reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Resize the background to the subject
    #[default]
    FitBackgroundToForeground,
    /// Center the subject on the background canvas
    FitForegroundToBackground,
}

impl ResizeMode {
    /// Value of the `--resize-mode` flag
    #[must_use]
    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::FitBackgroundToForeground => "fit-bg-to-fg",
            Self::FitForegroundToBackground => "fit-fg-to-bg",
        }
    }
}

/// Background compositing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundOptions {
    pub kind: BackgroundType,
    /// Hex color (`#ffffff`) or path to the background image
    pub data: String,
    pub resize_mode: ResizeMode,
}

/// Post-processing option set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostProcessingOptions {
    /// Enables the shadow and background stages
    pub enabled: bool,
    pub hole_strategy: HoleStrategy,
    pub crop: CropOption,
    pub shadow: ShadowOptions,
    pub background: Option<BackgroundOptions>,
}

/// One user-initiated processing request
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    id: Uuid,
    input_path: PathBuf,
    output_format: OutputFormat,
    model_name: String,
    edge_power: u8,
    upscale: UpscaleOptions,
    post_processing: PostProcessingOptions,
}

impl ProcessingJob {
    /// Start building a job for `input_path`
    #[must_use]
    pub fn builder<P: Into<PathBuf>>(input_path: P) -> ProcessingJobBuilder {
        ProcessingJobBuilder::new(input_path)
    }

    /// Unique job identifier
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    #[must_use]
    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Edge power (0-100) for the background-removal stage
    #[must_use]
    pub fn edge_power(&self) -> u8 {
        self.edge_power
    }

    #[must_use]
    pub fn upscale(&self) -> UpscaleOptions {
        self.upscale
    }

    #[must_use]
    pub fn post_processing(&self) -> &PostProcessingOptions {
        &self.post_processing
    }

    /// Whether the input goes through the animation pipeline
    #[must_use]
    pub fn is_animated(&self) -> bool {
        is_animated_path(&self.input_path)
    }

    /// Where the final artifact is written
    ///
    /// The stem loses any backup suffix, so re-running on `cat.bak.png`
    /// targets `cat.<ext>` just like running on `cat.png`.
    #[must_use]
    pub fn final_output_path(&self) -> PathBuf {
        let stem = self
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let clean = strip_backup_suffix(&stem);
        self.input_path
            .with_file_name(format!("{}{}", clean, self.output_format.extension()))
    }
}

/// Whether a path has one of the animated/video extensions
#[must_use]
pub fn is_animated_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ANIMATED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Whether a path is an input the pipeline accepts
#[must_use]
pub fn is_supported_input(path: &Path) -> bool {
    is_animated_path(path)
        || path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Builder for [`ProcessingJob`]
#[derive(Debug)]
pub struct ProcessingJobBuilder {
    input_path: PathBuf,
    output_format: String,
    model_name: String,
    edge_power: u8,
    upscale: UpscaleOptions,
    post_processing: PostProcessingOptions,
}

impl ProcessingJobBuilder {
    fn new<P: Into<PathBuf>>(input_path: P) -> Self {
        Self {
            input_path: input_path.into(),
            output_format: ".png".to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            edge_power: DEFAULT_EDGE_POWER,
            upscale: UpscaleOptions::default(),
            post_processing: PostProcessingOptions::default(),
        }
    }

    /// Set the output format (`png`, `.gif`, `svg`, ...)
    #[must_use]
    pub fn output_format<S: Into<String>>(mut self, format: S) -> Self {
        self.output_format = format.into();
        self
    }

    /// Set the background-removal model
    #[must_use]
    pub fn model<S: Into<String>>(mut self, model: S) -> Self {
        self.model_name = model.into();
        self
    }

    /// Set the edge power (0-100)
    #[must_use]
    pub fn edge_power(mut self, edge_power: u8) -> Self {
        self.edge_power = edge_power;
        self
    }

    /// Set the upscaler tile size
    #[must_use]
    pub fn tile_size(mut self, tile_size: u32) -> Self {
        self.upscale.tile_size = tile_size;
        self
    }

    /// Set the upscale factor (0 disables)
    #[must_use]
    pub fn upscale_factor(mut self, factor: u8) -> Self {
        self.upscale.factor = factor;
        self
    }

    /// Replace the whole post-processing option set
    #[must_use]
    pub fn post_processing(mut self, options: PostProcessingOptions) -> Self {
        self.post_processing = options;
        self
    }

    /// Enable or disable the shadow/background stages
    #[must_use]
    pub fn post_processing_enabled(mut self, enabled: bool) -> Self {
        self.post_processing.enabled = enabled;
        self
    }

    /// Select hole filling or noise removal
    #[must_use]
    pub fn hole_strategy(mut self, strategy: HoleStrategy) -> Self {
        self.post_processing.hole_strategy = strategy;
        self
    }

    /// Select the crop option
    #[must_use]
    pub fn crop(mut self, crop: CropOption) -> Self {
        self.post_processing.crop = crop;
        self
    }

    /// Set shadow parameters
    #[must_use]
    pub fn shadow(mut self, shadow: ShadowOptions) -> Self {
        self.post_processing.shadow = shadow;
        self
    }

    /// Set the background to composite onto
    #[must_use]
    pub fn background(mut self, background: Option<BackgroundOptions>) -> Self {
        self.post_processing.background = background;
        self
    }

    /// Validate and build the job
    ///
    /// # Errors
    /// - Input path missing or not a regular file
    /// - Output format not recognised
    /// - Upscale factor not in {0, 2, 3, 4}
    /// - Edge power above 100
    /// - Background data empty
    pub fn build(self) -> Result<ProcessingJob> {
        if !self.input_path.is_file() {
            return Err(FogStripperError::invalid_job(format!(
                "Input '{}' does not exist or is not a regular file",
                self.input_path.display()
            )));
        }

        let output_format = OutputFormat::parse(&self.output_format)?;

        if !VALID_UPSCALE_FACTORS.contains(&self.upscale.factor) {
            return Err(FogStripperError::config_value_error(
                "upscale factor",
                self.upscale.factor,
                "0, 2, 3, 4",
            ));
        }

        if self.edge_power > 100 {
            return Err(FogStripperError::config_value_error(
                "edge power",
                self.edge_power,
                "0-100",
            ));
        }

        if self.model_name.trim().is_empty() {
            return Err(FogStripperError::invalid_job("Model name is empty"));
        }

        if let Some(background) = &self.post_processing.background {
            if background.data.trim().is_empty() {
                return Err(FogStripperError::invalid_job(
                    "Background data is empty; pass a hex color or an image path",
                ));
            }
        }

        Ok(ProcessingJob {
            id: Uuid::new_v4(),
            input_path: self.input_path,
            output_format,
            model_name: self.model_name,
            edge_power: self.edge_power,
            upscale: self.upscale,
            post_processing: self.post_processing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_output_format_normalization() {
        assert_eq!(OutputFormat::parse("png").unwrap().extension(), ".png");
        assert_eq!(OutputFormat::parse(".png").unwrap().extension(), ".png");
        assert_eq!(OutputFormat::parse("PNG").unwrap().extension(), ".png");
        assert_eq!(OutputFormat::parse("..gif").unwrap().extension(), ".gif");
        assert!(OutputFormat::parse("").is_err());
        assert!(OutputFormat::parse("tar.gz").is_err());
        assert!(OutputFormat::parse("xcf").is_err());
    }

    #[test]
    fn test_output_format_kinds() {
        assert_eq!(OutputFormat::parse("png").unwrap().kind(), FormatKind::Raster);
        assert_eq!(OutputFormat::parse("jpg").unwrap().kind(), FormatKind::Raster);
        assert_eq!(OutputFormat::parse("svg").unwrap().kind(), FormatKind::Vector);
        assert_eq!(
            OutputFormat::parse("gif").unwrap().kind(),
            FormatKind::AnimatedContainer
        );
        assert_eq!(
            OutputFormat::parse("webm").unwrap().kind(),
            FormatKind::AnimatedContainer
        );
    }

    #[test]
    fn test_build_rejects_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = ProcessingJob::builder(dir.path().join("missing.png"))
            .build()
            .unwrap_err();
        assert!(matches!(err, FogStripperError::InvalidJob(_)));

        // A directory is not a regular file either
        let err = ProcessingJob::builder(dir.path()).build().unwrap_err();
        assert!(matches!(err, FogStripperError::InvalidJob(_)));
    }

    #[test]
    fn test_build_validates_upscale_factor() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "cat.png");

        for factor in [0u8, 2, 3, 4] {
            assert!(ProcessingJob::builder(&input)
                .upscale_factor(factor)
                .build()
                .is_ok());
        }
        for factor in [1u8, 5, 8] {
            assert!(ProcessingJob::builder(&input)
                .upscale_factor(factor)
                .build()
                .is_err());
        }
    }

    #[test]
    fn test_build_validates_edge_power_and_background() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "cat.png");

        assert!(ProcessingJob::builder(&input).edge_power(101).build().is_err());
        assert!(ProcessingJob::builder(&input).edge_power(100).build().is_ok());

        let empty_bg = BackgroundOptions {
            kind: BackgroundType::Color,
            data: "  ".to_string(),
            resize_mode: ResizeMode::default(),
        };
        assert!(ProcessingJob::builder(&input)
            .background(Some(empty_bg))
            .build()
            .is_err());
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let input = touch(&dir, "cat.png");
        let job = ProcessingJob::builder(&input).build().unwrap();

        assert_eq!(job.model_name(), "u2net");
        assert_eq!(job.edge_power(), 75);
        assert_eq!(job.upscale().tile_size, 512);
        assert!(!job.upscale().is_enabled());
        assert_eq!(job.output_format().extension(), ".png");
        assert_eq!(job.post_processing().hole_strategy, HoleStrategy::RemoveNoise);
        assert!(!job.post_processing().enabled);
    }

    #[test]
    fn test_final_output_path_strips_backup_suffix() {
        let dir = TempDir::new().unwrap();
        let original = touch(&dir, "cat.jpg");
        let backup = touch(&dir, "cat.bak.jpg");

        let job = ProcessingJob::builder(&original).build().unwrap();
        assert_eq!(job.final_output_path(), dir.path().join("cat.png"));

        let job = ProcessingJob::builder(&backup)
            .output_format("webp")
            .build()
            .unwrap();
        assert_eq!(job.final_output_path(), dir.path().join("cat.webp"));
    }

    #[test]
    fn test_animated_detection() {
        assert!(is_animated_path(Path::new("clip.gif")));
        assert!(is_animated_path(Path::new("clip.MP4")));
        assert!(is_animated_path(Path::new("clip.webm")));
        assert!(!is_animated_path(Path::new("photo.png")));
        assert!(!is_animated_path(Path::new("noext")));

        assert!(is_supported_input(Path::new("photo.JPEG")));
        assert!(!is_supported_input(Path::new("notes.txt")));
    }

    #[test]
    fn test_flag_values() {
        assert_eq!(BackgroundType::Color.as_flag(), "color");
        assert_eq!(BackgroundType::Image.as_flag(), "image");
        assert_eq!(ResizeMode::FitBackgroundToForeground.as_flag(), "fit-bg-to-fg");
        assert_eq!(ResizeMode::FitForegroundToBackground.as_flag(), "fit-fg-to-bg");
    }
}
