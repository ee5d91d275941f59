//! Shared fixtures for the pipeline integration tests
//!
//! External stages are replaced by in-process fakes implementing `Stage`, so
//! the tests exercise the real orchestrator, backup handling, post-processing
//! and export without any interpreter installed.

#![allow(dead_code)]

use fogstripper::{
    JobEvent, JobOrchestrator, ProgressReporter, Stage, StageKind, StageParams, StageSet,
    ToolsConfig, Vectorizer,
};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A configuration with every stage entry pointing at paths that never run
pub fn tools_config() -> ToolsConfig {
    ToolsConfig {
        rembg_interpreter: Some(PathBuf::from("/nonexistent/python")),
        rembg_script: Some(PathBuf::from("/nonexistent/worker_rembg.py")),
        upscale_interpreter: Some(PathBuf::from("/nonexistent/python")),
        upscale_script: Some(PathBuf::from("/nonexistent/worker_upscale.py")),
        effects_script: Some(PathBuf::from("/nonexistent/worker_effects.py")),
        background_script: Some(PathBuf::from("/nonexistent/worker_background.py")),
        ..ToolsConfig::default()
    }
}

/// Orchestrator whose stages are all replaced by `stages`
pub fn orchestrator_with(stages: Vec<Arc<dyn Stage>>) -> JobOrchestrator {
    let tools = tools_config();
    let set = stages
        .into_iter()
        .fold(StageSet::from_config(&tools), StageSet::with_stage);
    JobOrchestrator::new(Arc::new(tools)).with_stages(set)
}

/// Orchestrator with fake cutout and pass-through stages for every kind
pub fn fake_orchestrator() -> (JobOrchestrator, Arc<CutoutStage>) {
    let cutout = Arc::new(CutoutStage::default());
    let orchestrator = orchestrator_with(vec![
        cutout.clone() as Arc<dyn Stage>,
        Arc::new(CopyStage::new(StageKind::Upscale)),
        Arc::new(CopyStage::new(StageKind::Shadow)),
        Arc::new(CopyStage::new(StageKind::BackgroundComposite)),
    ]);
    (orchestrator, cutout)
}

/// Opaque test photo with a gradient so pixels are distinguishable
pub fn write_photo(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 4) as u8, (y * 4) as u8, 128, 255])
    });
    image.save(&path).unwrap();
    path
}

/// Keep the central half of the image and make everything else transparent
pub fn cutout(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (x0, x1) = (width / 4, width * 3 / 4);
    let (y0, y1) = (height / 4, height * 3 / 4);
    RgbaImage::from_fn(width, height, |x, y| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            *image.get_pixel(x, y)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Background removal fake: writes [`cutout`] of its input
#[derive(Default)]
pub struct CutoutStage {
    calls: Mutex<Vec<(PathBuf, StageParams)>>,
}

impl CutoutStage {
    pub fn calls(&self) -> Vec<(PathBuf, StageParams)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Stage for CutoutStage {
    fn kind(&self) -> StageKind {
        StageKind::BackgroundRemoval
    }

    fn run(&self, input: &Path, output: &Path, params: &StageParams) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), params.clone()));
        let Ok(image) = image::open(input) else {
            return false;
        };
        cutout(&image.to_rgba8()).save(output).is_ok()
    }
}

/// Copies its input to its output unchanged
pub struct CopyStage {
    kind: StageKind,
    runs: Mutex<usize>,
}

impl CopyStage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            runs: Mutex::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        *self.runs.lock().unwrap()
    }
}

impl Stage for CopyStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn run(&self, input: &Path, output: &Path, _params: &StageParams) -> bool {
        *self.runs.lock().unwrap() += 1;
        std::fs::copy(input, output).is_ok()
    }
}

/// Always reports failure without writing anything
pub struct FailingStage(pub StageKind);

impl Stage for FailingStage {
    fn kind(&self) -> StageKind {
        self.0
    }

    fn run(&self, _input: &Path, _output: &Path, _params: &StageParams) -> bool {
        false
    }
}

/// Reports success but never writes its output
pub struct SilentStage(pub StageKind);

impl Stage for SilentStage {
    fn kind(&self) -> StageKind {
        self.0
    }

    fn run(&self, _input: &Path, _output: &Path, _params: &StageParams) -> bool {
        true
    }
}

/// Vectorizer that always fails
pub struct FailingVectorizer;

impl Vectorizer for FailingVectorizer {
    fn vectorize(&self, _input: &Path, _output: &Path) -> bool {
        false
    }
}

/// Collects every event in emission order
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                JobEvent::Progress(pct) => Some(pct),
                _ => None,
            })
            .collect()
    }

    pub fn terminal_events(&self) -> Vec<JobEvent> {
        self.events()
            .into_iter()
            .filter(JobEvent::is_terminal)
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: JobEvent) {
        self.events.lock().unwrap().push(event);
    }
}
