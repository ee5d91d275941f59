//! Failure handling: backup restore, terminal events and temp dir cleanup

mod common;

use common::{
    cutout, fake_orchestrator, orchestrator_with, write_photo, CutoutStage, FailingStage,
    RecordingReporter, SilentStage,
};
use fogstripper::{
    JobEvent, JobOrchestrator, JobOutcome, JobState, ProcessingJob, Stage, StageKind,
    StageParams, ToolsConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Background removal fake that remembers the temp directory it wrote into
#[derive(Default)]
struct TempDirProbe {
    seen: Mutex<Option<PathBuf>>,
    fail: bool,
}

impl Stage for TempDirProbe {
    fn kind(&self) -> StageKind {
        StageKind::BackgroundRemoval
    }

    fn run(&self, input: &Path, output: &Path, _params: &StageParams) -> bool {
        *self.seen.lock().unwrap() = output.parent().map(Path::to_path_buf);
        if self.fail {
            return false;
        }
        let image = image::open(input).unwrap().to_rgba8();
        cutout(&image).save(output).is_ok()
    }
}

fn assert_single_error(reporter: &RecordingReporter) -> String {
    let terminal = reporter.terminal_events();
    assert_eq!(terminal.len(), 1, "expected exactly one terminal event");
    match &terminal[0] {
        JobEvent::Error(message) => message.clone(),
        other => panic!("expected an error event, got {:?}", other),
    }
}

#[test]
fn test_failing_background_removal_restores_original() {
    let dir = TempDir::new().unwrap();
    let input = write_photo(dir.path(), "cat.png", 32, 32);
    let original_bytes = fs::read(&input).unwrap();

    let orchestrator = orchestrator_with(vec![
        Arc::new(FailingStage(StageKind::BackgroundRemoval)) as Arc<dyn Stage>,
    ]);
    let reporter = Arc::new(RecordingReporter::default());
    let job = ProcessingJob::builder(&input).build().unwrap();

    let outcome = orchestrator.run(job, reporter.clone());

    assert!(!outcome.is_success());
    assert!(input.is_file());
    assert_eq!(fs::read(&input).unwrap(), original_bytes);
    assert!(!dir.path().join("cat.bak.png").exists());

    let message = assert_single_error(&reporter);
    assert!(message.contains("background-removal"));
    assert!(reporter.events().contains(&JobEvent::State(JobState::Failed)));
    assert!(!reporter
        .events()
        .iter()
        .any(|event| matches!(event, JobEvent::Finished(_))));
}

#[test]
fn test_stage_without_output_fails_job() {
    let dir = TempDir::new().unwrap();
    let input = write_photo(dir.path(), "cat.png", 32, 32);

    let orchestrator = orchestrator_with(vec![
        Arc::new(SilentStage(StageKind::BackgroundRemoval)) as Arc<dyn Stage>,
    ]);
    let reporter = Arc::new(RecordingReporter::default());
    let job = ProcessingJob::builder(&input).build().unwrap();

    let outcome = orchestrator.run(job, reporter.clone());

    assert!(matches!(outcome, JobOutcome::Failed(_)));
    assert!(input.is_file());
    let message = assert_single_error(&reporter);
    assert!(message.contains("wrote no"));
}

#[test]
fn test_failing_upscale_restores_original() {
    let dir = TempDir::new().unwrap();
    let input = write_photo(dir.path(), "cat.png", 32, 32);

    let orchestrator = orchestrator_with(vec![
        Arc::new(CutoutStage::default()) as Arc<dyn Stage>,
        Arc::new(FailingStage(StageKind::Upscale)),
    ]);
    let reporter = Arc::new(RecordingReporter::default());
    let job = ProcessingJob::builder(&input)
        .upscale_factor(4)
        .build()
        .unwrap();

    let outcome = orchestrator.run(job, reporter.clone());

    assert!(!outcome.is_success());
    assert!(input.is_file());
    assert!(!dir.path().join("cat.bak.png").exists());
    assert!(assert_single_error(&reporter).contains("upscale"));
    // Progress stopped after background removal
    assert_eq!(reporter.progress(), vec![10, 30]);
}

#[test]
fn test_empty_configuration_fails_before_protecting() {
    let dir = TempDir::new().unwrap();
    let input = write_photo(dir.path(), "cat.png", 16, 16);

    let orchestrator = JobOrchestrator::new(Arc::new(ToolsConfig::default()));
    let reporter = Arc::new(RecordingReporter::default());
    let job = ProcessingJob::builder(&input).build().unwrap();

    let outcome = orchestrator.run(job, reporter.clone());

    assert!(!outcome.is_success());
    assert!(input.is_file());
    assert!(!dir.path().join("cat.bak.png").exists());
    assert!(!reporter
        .events()
        .contains(&JobEvent::State(JobState::Protecting)));
    assert!(assert_single_error(&reporter).contains("Configuration"));
}

#[test]
fn test_temp_dir_removed_after_success() {
    let dir = TempDir::new().unwrap();
    let input = write_photo(dir.path(), "cat.png", 32, 32);

    let probe = Arc::new(TempDirProbe::default());
    let orchestrator = orchestrator_with(vec![probe.clone() as Arc<dyn Stage>]);
    let job = ProcessingJob::builder(&input).build().unwrap();

    let outcome = orchestrator.run(job, Arc::new(RecordingReporter::default()));
    assert!(outcome.is_success());

    let temp_dir = probe.seen.lock().unwrap().clone().unwrap();
    assert!(temp_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("fogstripper_"));
    assert!(!temp_dir.exists());
}

#[test]
fn test_temp_dir_removed_after_failure() {
    let dir = TempDir::new().unwrap();
    let input = write_photo(dir.path(), "cat.png", 32, 32);

    let probe = Arc::new(TempDirProbe {
        fail: true,
        ..TempDirProbe::default()
    });
    let orchestrator = orchestrator_with(vec![probe.clone() as Arc<dyn Stage>]);
    let job = ProcessingJob::builder(&input).build().unwrap();

    let outcome = orchestrator.run(job, Arc::new(RecordingReporter::default()));
    assert!(!outcome.is_success());

    let temp_dir = probe.seen.lock().unwrap().clone().unwrap();
    assert!(!temp_dir.exists());
}

#[test]
fn test_job_builder_rejects_missing_input() {
    let dir = TempDir::new().unwrap();
    assert!(ProcessingJob::builder(dir.path().join("missing.png"))
        .build()
        .is_err());
    assert!(ProcessingJob::builder(dir.path()).build().is_err());
}

#[tokio::test]
async fn test_spawned_job_streams_events() {
    let dir = TempDir::new().unwrap();
    let input = write_photo(dir.path(), "cat.png", 32, 32);
    let (orchestrator, _) = fake_orchestrator();

    let job = ProcessingJob::builder(&input).build().unwrap();
    let job_id = job.id();
    let handle = orchestrator.spawn(job);
    assert_eq!(handle.job_id(), job_id);

    let (outcome, events) = handle.collect().await.unwrap();

    let output = dir.path().join("cat.png");
    assert_eq!(outcome, JobOutcome::Completed(output.clone()));
    assert_eq!(events.first(), Some(&JobEvent::State(JobState::Protecting)));
    assert_eq!(events.last(), Some(&JobEvent::Finished(output)));
    assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_spawned_failure_reports_one_error() {
    let dir = TempDir::new().unwrap();
    let input = write_photo(dir.path(), "cat.png", 32, 32);
    let orchestrator = orchestrator_with(vec![
        Arc::new(FailingStage(StageKind::BackgroundRemoval)) as Arc<dyn Stage>,
    ]);

    let job = ProcessingJob::builder(&input).build().unwrap();
    let (outcome, events) = orchestrator.spawn(job).collect().await.unwrap();

    assert!(!outcome.is_success());
    assert!(input.is_file());
    let errors: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, JobEvent::Error(_)))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(events.last(), Some(JobEvent::Error(_))));
}
