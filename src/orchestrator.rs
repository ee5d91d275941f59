//! Job orchestrator
//!
//! Drives one job through `Protecting → Dispatching → Running → Finalizing`
//! and ends in `Completed` or `Failed`. Every phase returns a typed result;
//! the orchestrator switches on it, restores the original on failure and
//! emits exactly one terminal event. The job temp directory is removed on
//! every path.

use crate::backup::{BackupManager, BackupRecord};
use crate::config::ToolsConfig;
use crate::error::{FogStripperError, Result};
use crate::job::ProcessingJob;
use crate::pipeline::{run_animation, run_static, PipelineContext};
use crate::services::{
    ChannelProgressReporter, JobEvent, JobState, ProgressReporter, ProgressTracker,
};
use crate::stages::StageSet;
use crate::vectorize::{ContourVectorizer, Vectorizer};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// Prefix of every job temp directory
pub const TEMP_DIR_PREFIX: &str = "fogstripper_";

/// Terminal result of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Output file or frame directory
    Completed(PathBuf),
    /// Human-readable failure description
    Failed(String),
}

impl JobOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }

    #[must_use]
    pub fn output(&self) -> Option<&PathBuf> {
        match self {
            JobOutcome::Completed(path) => Some(path),
            JobOutcome::Failed(_) => None,
        }
    }
}

/// Runs jobs against an injected, read-only tool configuration
#[derive(Clone)]
pub struct JobOrchestrator {
    tools: Arc<ToolsConfig>,
    stages: StageSet,
    vectorizer: Arc<dyn Vectorizer>,
    backups: BackupManager,
}

impl JobOrchestrator {
    /// Orchestrator using external stages built from `tools`
    #[must_use]
    pub fn new(tools: Arc<ToolsConfig>) -> Self {
        let stages = StageSet::from_config(&tools);
        Self {
            tools,
            stages,
            vectorizer: Arc::new(ContourVectorizer::default()),
            backups: BackupManager::new(),
        }
    }

    /// Replace the stage set
    #[must_use]
    pub fn with_stages(mut self, stages: StageSet) -> Self {
        self.stages = stages;
        self
    }

    /// Replace the vectorizer used for `.svg` output
    #[must_use]
    pub fn with_vectorizer(mut self, vectorizer: Arc<dyn Vectorizer>) -> Self {
        self.vectorizer = vectorizer;
        self
    }

    #[must_use]
    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    /// Run a job to completion on the calling thread
    pub fn run(&self, job: ProcessingJob, reporter: Arc<dyn ProgressReporter>) -> JobOutcome {
        let span = info_span!("job", id = %job.id(), input = %job.input_path().display());
        let _guard = span.enter();
        let mut tracker = ProgressTracker::new(reporter);

        info!(
            format = %job.output_format(),
            animated = job.is_animated(),
            "Job started"
        );

        match self.execute(&job, &mut tracker) {
            Ok(output) => {
                tracker.set_state(JobState::Completed);
                info!(output = %output.display(), elapsed_ms = tracker.elapsed_ms(), "Job completed");
                tracker.finished(output.clone());
                JobOutcome::Completed(output)
            },
            Err(e) => {
                let message = e.to_string();
                error!("Job failed: {}", message);
                tracker.set_state(JobState::Failed);
                tracker.error(message.clone());
                JobOutcome::Failed(message)
            },
        }
    }

    /// Run a job on a blocking worker thread
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(&self, job: ProcessingJob) -> JobHandle {
        let (reporter, events) = ChannelProgressReporter::channel();
        let orchestrator = self.clone();
        let job_id = job.id();
        let join = tokio::task::spawn_blocking(move || orchestrator.run(job, Arc::new(reporter)));
        JobHandle {
            job_id,
            events,
            join,
        }
    }

    fn execute(&self, job: &ProcessingJob, tracker: &mut ProgressTracker) -> Result<PathBuf> {
        if self.tools.is_empty() {
            return Err(FogStripperError::config(
                "No external tools configured; cannot start the job",
            ));
        }

        let temp_dir = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .map_err(|e| FogStripperError::file_io_error("create temp dir for", job.input_path(), &e))?;

        tracker.set_state(JobState::Protecting);
        let record = self.backups.protect(job.input_path())?;

        let result = self.process(job, &record, &temp_dir, tracker);

        if result.is_err() {
            match self.backups.restore_on_failure(&record, job.input_path()) {
                Ok(true) => warn!(path = %job.input_path().display(), "Backup restored"),
                Ok(false) => {},
                Err(e) => error!("Could not restore original: {}", e),
            }
        }

        let temp_path = temp_dir.path().to_path_buf();
        if let Err(e) = temp_dir.close() {
            warn!(dir = %temp_path.display(), "Failed to remove temp dir: {}", e);
        }

        result
    }

    fn process(
        &self,
        job: &ProcessingJob,
        record: &BackupRecord,
        temp_dir: &TempDir,
        tracker: &mut ProgressTracker,
    ) -> Result<PathBuf> {
        let ctx = PipelineContext {
            job,
            source: record.working_path(),
            temp_dir: temp_dir.path(),
            stages: &self.stages,
            vectorizer: self.vectorizer.as_ref(),
            tools: &self.tools,
        };

        tracker.set_state(JobState::Dispatching);
        let animated = job.is_animated();

        tracker.set_state(JobState::Running);
        let output = if animated {
            run_animation(&ctx, tracker)?
        } else {
            run_static(&ctx, tracker)?
        };

        tracker.set_state(JobState::Finalizing);
        if !output.exists() {
            return Err(FogStripperError::missing_artifact(&output));
        }
        Ok(output)
    }
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("tools", &self.tools)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

/// A job running on a worker thread
#[derive(Debug)]
pub struct JobHandle {
    job_id: Uuid,
    /// Events in emission order; closes after the terminal event
    pub events: UnboundedReceiver<JobEvent>,
    join: JoinHandle<JobOutcome>,
}

impl JobHandle {
    #[must_use]
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Wait for the worker to finish
    ///
    /// # Errors
    /// - The worker thread panicked or was cancelled
    pub async fn wait(self) -> Result<JobOutcome> {
        self.join
            .await
            .map_err(|e| FogStripperError::internal(format!("Job worker failed: {}", e)))
    }

    /// Wait for the worker and return every event it emitted
    ///
    /// # Errors
    /// - See [`JobHandle::wait`]
    pub async fn collect(mut self) -> Result<(JobOutcome, Vec<JobEvent>)> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let outcome = self
            .join
            .await
            .map_err(|e| FogStripperError::internal(format!("Job worker failed: {}", e)))?;
        Ok((outcome, events))
    }
}
