//! Conversion of CLI arguments into tool configuration and jobs

use crate::cli::main_impl::{Cli, CliResizeMode};
use crate::{
    config::ToolsConfig,
    job::{
        BackgroundOptions, BackgroundType, CropOption, HoleStrategy, OutputFormat, ProcessingJob,
        ResizeMode, ShadowOptions,
    },
};
use anyhow::{Context, Result};
use std::path::Path;

/// Converts parsed CLI arguments into library types
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Validate arguments that clap cannot check on its own
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        OutputFormat::parse(&cli.format)
            .with_context(|| format!("Unsupported output format '{}'", cli.format))?;

        if cli.model.trim().is_empty() {
            anyhow::bail!("Model name cannot be empty");
        }

        if cli.tile == 0 {
            anyhow::bail!("Tile size must be greater than zero");
        }

        if let Some(pattern) = &cli.pattern {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid file pattern '{}'", pattern))?;
        }

        if let Some(color) = &cli.bg_color {
            if !is_hex_color(color) {
                anyhow::bail!("Background color must look like #rrggbb, got '{}'", color);
            }
        }

        if let Some(image) = &cli.bg_image {
            if !image.is_file() {
                anyhow::bail!("Background image not found: {}", image.display());
            }
        }

        Ok(())
    }

    /// Load the tool configuration named by `--config`, or the default one
    pub(crate) fn tools_config(cli: &Cli) -> Result<ToolsConfig> {
        let config = match &cli.config {
            Some(path) => ToolsConfig::load_from_path(path)?,
            None => ToolsConfig::load()?,
        };
        if config.is_empty() {
            log::warn!("Tool configuration has no stage entries; every job will fail");
        }
        Ok(config)
    }

    /// Build the job for one input file
    pub(crate) fn job_from_cli(cli: &Cli, input: &Path) -> Result<ProcessingJob> {
        let background = match (&cli.bg_color, &cli.bg_image) {
            (Some(color), _) => Some(BackgroundOptions {
                kind: BackgroundType::Color,
                data: color.clone(),
                resize_mode: resize_mode(cli.resize_mode),
            }),
            (None, Some(image)) => Some(BackgroundOptions {
                kind: BackgroundType::Image,
                data: image.to_string_lossy().into_owned(),
                resize_mode: resize_mode(cli.resize_mode),
            }),
            (None, None) => None,
        };

        let hole_strategy = if cli.fill_holes {
            HoleStrategy::FillHoles
        } else {
            HoleStrategy::RemoveNoise
        };
        let crop = if cli.trim {
            CropOption::Trim
        } else {
            CropOption::None
        };

        let job = ProcessingJob::builder(input)
            .output_format(cli.format.clone())
            .model(cli.model.clone())
            .edge_power(cli.potencia)
            .tile_size(cli.tile)
            .upscale_factor(cli.upscale)
            .post_processing_enabled(cli.post_processing || cli.fill_holes || cli.trim || cli.shadow)
            .hole_strategy(hole_strategy)
            .crop(crop)
            .shadow(ShadowOptions {
                enabled: cli.shadow,
                blur: cli.shadow_blur,
                opacity: cli.shadow_opacity,
            })
            .background(background)
            .build()?;
        Ok(job)
    }
}

fn resize_mode(mode: CliResizeMode) -> ResizeMode {
    match mode {
        CliResizeMode::FitBgToFg => ResizeMode::FitBackgroundToForeground,
        CliResizeMode::FitFgToBg => ResizeMode::FitForegroundToBackground,
    }
}

fn is_hex_color(value: &str) -> bool {
    let digits = value.strip_prefix('#').unwrap_or(value);
    matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}
