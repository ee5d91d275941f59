//! Static image and animation pipelines
//!
//! Both pipelines run inside a job-scoped temporary directory owned by the
//! orchestrator. Each external stage reads the previous artifact and writes
//! a new one; a stage reporting failure, or reporting success without
//! writing its output, aborts the pipeline with a stage error.

pub mod animation;
pub mod static_image;

pub use animation::run_animation;
pub use static_image::run_static;

use crate::config::ToolsConfig;
use crate::error::{FogStripperError, Result};
use crate::job::ProcessingJob;
use crate::stages::{StageKind, StageParams, StageSet};
use crate::vectorize::Vectorizer;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file produced by one pipeline step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineArtifact {
    pub path: PathBuf,
    /// Name of the step that wrote it (`source` for the backup itself)
    pub produced_by: &'static str,
}

impl PipelineArtifact {
    /// The protected original the pipeline starts from
    #[must_use]
    pub fn source(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            produced_by: "source",
        }
    }
}

/// Everything a pipeline needs for one job
pub struct PipelineContext<'a> {
    pub job: &'a ProcessingJob,
    /// Backup holding the true original pixels
    pub source: &'a Path,
    /// Job-scoped scratch directory
    pub temp_dir: &'a Path,
    pub stages: &'a StageSet,
    pub vectorizer: &'a dyn Vectorizer,
    pub tools: &'a ToolsConfig,
}

impl PipelineContext<'_> {
    /// Path of a named artifact inside the job temp directory
    #[must_use]
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.temp_dir.join(name)
    }

    /// Run one external stage and return its artifact
    ///
    /// # Errors
    /// - The stage reports failure
    /// - The stage reports success but its output file is missing
    pub fn run_stage(
        &self,
        kind: StageKind,
        input: &PipelineArtifact,
        output: PathBuf,
        params: &StageParams,
    ) -> Result<PipelineArtifact> {
        debug!(stage = kind.name(), input = %input.path.display(), "Running stage");
        if !self.stages.get(kind).run(&input.path, &output, params) {
            return Err(FogStripperError::stage_failure(
                kind.name(),
                format!("processing {} failed", input.path.display()),
            ));
        }
        if !output.is_file() {
            return Err(FogStripperError::stage_failure(
                kind.name(),
                format!("reported success but wrote no {}", output.display()),
            ));
        }
        Ok(PipelineArtifact {
            path: output,
            produced_by: kind.name(),
        })
    }
}

impl std::fmt::Debug for PipelineContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("job", &self.job.id())
            .field("source", &self.source)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}
