#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # FogStripper
//!
//! A recoverable job pipeline for background removal, cleanup, upscaling and
//! recompositing of still images and animations.
//!
//! The heavy lifting (segmentation, super-resolution, shadow synthesis,
//! compositing) is done by external stage programs configured in a
//! [`ToolsConfig`]. This crate sequences those stages, runs the in-process
//! cleanup algorithms between them, exports to the requested format and
//! guarantees that the user's original file is never lost: it is renamed to a
//! `.bak` backup before processing and restored when a job fails.
//!
//! ## Features
//!
//! - **Static images**: background removal, optional upscaling, hole filling or
//!   noise removal, trimming, drop shadow and background compositing
//! - **Animations**: GIF and video containers processed frame by frame and
//!   re-encoded, or written out as a frame sequence
//! - **Vector export**: built-in contour tracer writing SVG
//! - **Progress events**: per-job state and percentage events over a channel
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fogstripper::{JobOrchestrator, ProcessingJob, ToolsConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tools = ToolsConfig::load()?;
//! let orchestrator = JobOrchestrator::new(Arc::new(tools));
//!
//! let job = ProcessingJob::builder("photos/cat.png")
//!     .output_format("webp")
//!     .upscale_factor(2)
//!     .build()?;
//!
//! let (outcome, events) = orchestrator.spawn(job).collect().await?;
//! println!("{:?} after {} events", outcome, events.len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and progress bars
//! - `webp-support` (default): WebP image format support
//! - `video-support`: in-process video decoding with FFmpeg libraries
//!   (otherwise the `ffmpeg` executable is used)
//! - `tracing-json`, `tracing-files`: extra log outputs for the CLI

pub mod animation;
pub mod backup;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod postprocess;
pub mod services;
pub mod stages;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod utils;
pub mod vectorize;

// Public API exports
pub use backup::{BackupManager, BackupRecord};
pub use config::ToolsConfig;
pub use error::{FogStripperError, Result};
pub use job::{
    BackgroundOptions, BackgroundType, CropOption, FormatKind, HoleStrategy, OutputFormat,
    PostProcessingOptions, ProcessingJob, ProcessingJobBuilder, ResizeMode, ShadowOptions,
    UpscaleOptions,
};
pub use orchestrator::{JobHandle, JobOrchestrator, JobOutcome};
pub use services::{
    ChannelProgressReporter, ConsoleProgressReporter, JobEvent, JobState, NoOpProgressReporter,
    ProgressReporter,
};
pub use stages::{CommandRunner, ExternalStage, Stage, StageKind, StageParams, StageSet};
pub use vectorize::{ContourVectorizer, Vectorizer};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat, TracingGuard, TracingOutput};
