//! FogStripper CLI Tool
//!
//! Runs one pipeline job per input file, sequentially, and reports progress
//! either as log lines or as an indicatif bar.

use super::config::CliConfigBuilder;
use super::progress::BarProgressReporter;
use crate::{
    backup::{is_backup_path, original_path_for},
    job::is_supported_input,
    orchestrator::{JobOrchestrator, JobOutcome},
    services::{ConsoleProgressReporter, ProgressReporter},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Background removal and recompositing pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "fogstripper")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input images, animations or directories
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<PathBuf>,

    /// Output format extension (png, jpg, webp, svg, gif, webm, mp4, ...)
    #[arg(short, long, default_value = "png")]
    pub format: String,

    /// Background removal model name
    #[arg(short, long, default_value = crate::job::DEFAULT_MODEL)]
    pub model: String,

    /// Edge power passed to the background removal stage (0-100)
    #[arg(long, default_value_t = crate::job::DEFAULT_EDGE_POWER,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    pub potencia: u8,

    /// Upscaler tile size
    #[arg(long, default_value_t = crate::job::DEFAULT_TILE_SIZE)]
    pub tile: u32,

    /// Upscale factor (0 disables upscaling)
    #[arg(short, long, default_value_t = 0, value_parser = parse_upscale_factor)]
    pub upscale: u8,

    /// Enable post-processing (noise removal unless --fill-holes is given)
    #[arg(long)]
    pub post_processing: bool,

    /// Fill interior holes from the original instead of removing noise (implies --post-processing)
    #[arg(long)]
    pub fill_holes: bool,

    /// Trim to the bounding box of opaque content (implies --post-processing)
    #[arg(long)]
    pub trim: bool,

    /// Add a drop shadow (implies --post-processing)
    #[arg(long)]
    pub shadow: bool,

    /// Shadow blur radius
    #[arg(long, default_value_t = 15)]
    pub shadow_blur: u32,

    /// Shadow opacity (0-255)
    #[arg(long, default_value_t = 180)]
    pub shadow_opacity: u8,

    /// Composite onto a solid color (e.g. "#ffffff")
    #[arg(long, value_name = "HEX", conflicts_with = "bg_image")]
    pub bg_color: Option<String>,

    /// Composite onto a background image
    #[arg(long, value_name = "PATH")]
    pub bg_image: Option<PathBuf>,

    /// How foreground and background are sized against each other
    #[arg(long, value_enum, default_value_t = CliResizeMode::FitBgToFg)]
    pub resize_mode: CliResizeMode,

    /// Tool configuration file (overrides FOGSTRIPPER_CONFIG and the default location)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for directory inputs (e.g., "*.png")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Show a progress bar per job
    #[arg(long)]
    pub progress: bool,

    /// Also write logs to a file (default: <data dir>/fogstripper/app.log)
    #[cfg(feature = "tracing-files")]
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<Option<PathBuf>>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliResizeMode {
    /// Scale the background to the foreground
    FitBgToFg,
    /// Scale the foreground to the background
    FitFgToBg,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _tracing_guard = init_tracing(&cli).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;

    let tools = CliConfigBuilder::tools_config(&cli).context("Failed to load tool configuration")?;
    let orchestrator = JobOrchestrator::new(Arc::new(tools));

    let inputs = collect_inputs(&cli)?;
    if inputs.is_empty() {
        warn!("No supported media files found in the provided inputs");
        return Ok(());
    }
    info!("Found {} file(s) to process", inputs.len());

    let start_time = Instant::now();
    let mut completed = 0usize;
    let mut failed = 0usize;

    for input in &inputs {
        match process_single_file(&cli, &orchestrator, input).await {
            Ok(JobOutcome::Completed(_)) => completed += 1,
            Ok(JobOutcome::Failed(_)) => failed += 1,
            Err(e) => {
                error!("{}: {:#}", input.display(), e);
                failed += 1;
            },
        }
    }

    info!(
        "Processed {} file(s) in {:.2}s ({} failed)",
        completed,
        start_time.elapsed().as_secs_f64(),
        failed
    );

    if failed > 0 {
        anyhow::bail!("{} of {} job(s) failed", failed, inputs.len());
    }
    Ok(())
}

fn parse_upscale_factor(raw: &str) -> std::result::Result<u8, String> {
    raw.parse::<u8>()
        .ok()
        .filter(|factor| crate::job::VALID_UPSCALE_FACTORS.contains(factor))
        .ok_or_else(|| format!("'{}' is not one of 0, 2, 3, 4", raw))
}

/// Initialize tracing based on verbosity level and the optional log file
fn init_tracing(cli: &Cli) -> Result<crate::tracing_config::TracingGuard> {
    use crate::tracing_config::{TracingConfig, TracingFormat};

    #[allow(unused_mut)]
    let mut config = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(TracingFormat::Console)
        .with_session_id(uuid::Uuid::new_v4().to_string());

    #[cfg(feature = "tracing-files")]
    if let Some(log_file) = &cli.log_file {
        let path = match log_file {
            Some(path) => path.clone(),
            None => crate::tracing_config::default_log_path()
                .context("Failed to determine the default log file location")?,
        };
        config = config.with_output(crate::tracing_config::TracingOutput::Both(path));
    }

    config.init()
}

/// Run one job and forward its events to the chosen reporter
async fn process_single_file(
    cli: &Cli,
    orchestrator: &JobOrchestrator,
    input: &Path,
) -> Result<JobOutcome> {
    let job = CliConfigBuilder::job_from_cli(cli, input)
        .with_context(|| format!("Invalid job for {}", input.display()))?;

    let reporter: Arc<dyn ProgressReporter> = if cli.progress {
        Arc::new(BarProgressReporter::new(input)?)
    } else {
        Arc::new(ConsoleProgressReporter::new(cli.verbose > 0))
    };

    let mut handle = orchestrator.spawn(job);
    while let Some(event) = handle.events.recv().await {
        reporter.report(event);
    }
    let outcome = handle.wait().await?;
    Ok(outcome)
}

/// Expand the command line inputs into a sorted list of files
fn collect_inputs(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();

    for path in &cli.input {
        if path.is_file() {
            if is_supported_input(path) {
                all_files.push(path.clone());
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_media_files(path, cli.recursive, cli.pattern.as_deref())?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    all_files.sort();
    all_files.dedup();
    Ok(drop_shadowed_backups(all_files))
}

/// Drop `*.bak.*` files whose previous output was also collected
///
/// Both would run against the same backup and write the same output.
fn drop_shadowed_backups(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let collected: HashSet<PathBuf> = files.iter().cloned().collect();
    files
        .into_iter()
        .filter(|path| {
            let shadowed = is_backup_path(path) && collected.contains(&original_path_for(path));
            if shadowed {
                info!("Skipping {} (its output is already queued)", path.display());
            }
            !shadowed
        })
        .collect()
}

/// Find all supported media files in a directory
fn find_media_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && is_supported_input(path) && matches_pattern(path, pattern)
        {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Check if file matches the given pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => {
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            } else {
                false
            }
        },
        None => true,
    }
}
