//! Pipeline stages
//!
//! Every external processing step (background removal, upscaling, shadow
//! synthesis, background compositing) is reached through the [`Stage`]
//! trait. The production adapters in [`external`] shell out to the configured
//! interpreter and script through the [`CommandRunner`]; tests swap in
//! in-process implementations through [`StageSet::with_stage`].

pub mod external;
pub mod invoker;

pub use external::ExternalStage;
pub use invoker::{CommandOutput, CommandRunner};

use crate::config::ToolsConfig;
use crate::job::{BackgroundOptions, BackgroundType, ProcessingJob, ResizeMode};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The four external stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    BackgroundRemoval,
    Upscale,
    Shadow,
    BackgroundComposite,
}

impl StageKind {
    /// All stage kinds in pipeline order
    pub const ALL: [StageKind; 4] = [
        StageKind::BackgroundRemoval,
        StageKind::Upscale,
        StageKind::Shadow,
        StageKind::BackgroundComposite,
    ];

    /// Stable name used in logs and error messages
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::BackgroundRemoval => "background-removal",
            StageKind::Upscale => "upscale",
            StageKind::Shadow => "shadow",
            StageKind::BackgroundComposite => "background-composite",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage-specific parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageParams {
    BackgroundRemoval { model: String, edge_power: u8 },
    Upscale { tile_size: u32, factor: u8 },
    Shadow,
    BackgroundComposite {
        kind: BackgroundType,
        data: String,
        resize_mode: ResizeMode,
    },
}

impl StageParams {
    /// Background-removal parameters for a job
    #[must_use]
    pub fn background_removal(job: &ProcessingJob) -> Self {
        Self::BackgroundRemoval {
            model: job.model_name().to_string(),
            edge_power: job.edge_power(),
        }
    }

    /// Upscale parameters for a job
    #[must_use]
    pub fn upscale(job: &ProcessingJob) -> Self {
        let options = job.upscale();
        Self::Upscale {
            tile_size: options.tile_size,
            factor: options.factor,
        }
    }

    /// Compositing parameters for a background description
    #[must_use]
    pub fn background_composite(background: &BackgroundOptions) -> Self {
        Self::BackgroundComposite {
            kind: background.kind,
            data: background.data.clone(),
            resize_mode: background.resize_mode,
        }
    }

    /// Stage these parameters belong to
    #[must_use]
    pub fn kind(&self) -> StageKind {
        match self {
            StageParams::BackgroundRemoval { .. } => StageKind::BackgroundRemoval,
            StageParams::Upscale { .. } => StageKind::Upscale,
            StageParams::Shadow => StageKind::Shadow,
            StageParams::BackgroundComposite { .. } => StageKind::BackgroundComposite,
        }
    }

    /// Command line flags following `--input`/`--output`
    #[must_use]
    pub fn flags(&self) -> Vec<OsString> {
        let pairs: Vec<(&str, String)> = match self {
            StageParams::BackgroundRemoval { model, edge_power } => vec![
                ("--model", model.clone()),
                ("--potencia", edge_power.to_string()),
            ],
            StageParams::Upscale { tile_size, factor } => vec![
                ("--tile", tile_size.to_string()),
                ("--outscale", factor.to_string()),
            ],
            StageParams::Shadow => Vec::new(),
            StageParams::BackgroundComposite {
                kind,
                data,
                resize_mode,
            } => vec![
                ("--bg-type", kind.as_flag().to_string()),
                ("--bg-data", data.clone()),
                ("--resize-mode", resize_mode.as_flag().to_string()),
            ],
        };

        pairs
            .into_iter()
            .flat_map(|(flag, value)| [OsString::from(flag), OsString::from(value)])
            .collect()
    }
}

/// One out-of-process unit of work
///
/// `run` reports success as a plain boolean: `true` only when the stage
/// finished cleanly. Implementations log their own diagnostics and never
/// panic on tool failure.
pub trait Stage: Send + Sync {
    /// Which pipeline slot this stage fills
    fn kind(&self) -> StageKind;

    /// Transform `input` into `output`
    fn run(&self, input: &Path, output: &Path, params: &StageParams) -> bool;
}

/// One stage per kind, shared read-only between jobs
#[derive(Clone)]
pub struct StageSet {
    background_removal: Arc<dyn Stage>,
    upscale: Arc<dyn Stage>,
    shadow: Arc<dyn Stage>,
    background_composite: Arc<dyn Stage>,
}

impl StageSet {
    /// External stages built from the tool configuration
    #[must_use]
    pub fn from_config(config: &ToolsConfig) -> Self {
        let runner = CommandRunner::new().with_timeout(config.stage_timeout());
        let make = |kind: StageKind| -> Arc<dyn Stage> {
            Arc::new(ExternalStage::new(
                kind,
                config.stage_command(kind),
                runner.clone(),
            ))
        };

        Self {
            background_removal: make(StageKind::BackgroundRemoval),
            upscale: make(StageKind::Upscale),
            shadow: make(StageKind::Shadow),
            background_composite: make(StageKind::BackgroundComposite),
        }
    }

    /// Replace the stage filling `stage.kind()`
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        match stage.kind() {
            StageKind::BackgroundRemoval => self.background_removal = stage,
            StageKind::Upscale => self.upscale = stage,
            StageKind::Shadow => self.shadow = stage,
            StageKind::BackgroundComposite => self.background_composite = stage,
        }
        self
    }

    /// Stage for a kind
    #[must_use]
    pub fn get(&self, kind: StageKind) -> &dyn Stage {
        match kind {
            StageKind::BackgroundRemoval => self.background_removal.as_ref(),
            StageKind::Upscale => self.upscale.as_ref(),
            StageKind::Shadow => self.shadow.as_ref(),
            StageKind::BackgroundComposite => self.background_composite.as_ref(),
        }
    }
}

impl fmt::Debug for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSet").finish_non_exhaustive()
    }
}
