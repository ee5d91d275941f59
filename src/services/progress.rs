//! Progress reporting service
//!
//! Jobs report state transitions, fractional progress and exactly one
//! terminal event through a [`ProgressReporter`]. Frontends pick the
//! reporter: log lines, a channel feeding an async caller, or nothing.

use instant::Instant;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Moving the original aside
    Protecting,
    /// Choosing the static or animation pipeline
    Dispatching,
    /// Pipeline running
    Running,
    /// Checking the final artifact
    Finalizing,
    /// Final artifact produced
    Completed,
    /// Job failed, original restored
    Failed,
}

impl JobState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            JobState::Protecting => "Backing up original",
            JobState::Dispatching => "Selecting pipeline",
            JobState::Running => "Processing",
            JobState::Finalizing => "Finalizing output",
            JobState::Completed => "Completed",
            JobState::Failed => "Failed",
        }
    }

    /// Whether the state ends the job
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Event emitted while a job runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    State(JobState),
    /// Percentage 0-100
    Progress(u8),
    /// Terminal success carrying the output file or directory
    Finished(PathBuf),
    /// Terminal failure carrying a human-readable message
    Error(String),
}

impl JobEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Finished(_) | JobEvent::Error(_))
    }
}

/// Receives job events
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: JobEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report(&self, _event: JobEvent) {}
}

/// Writes events as log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report(&self, event: JobEvent) {
        match event {
            JobEvent::State(state) => {
                if self.verbose {
                    log::info!("{}", state.description());
                }
            },
            JobEvent::Progress(pct) => log::info!("[{}%]", pct),
            JobEvent::Finished(path) => log::info!("✅ Finished: {}", path.display()),
            JobEvent::Error(message) => log::error!("❌ {}", message),
        }
    }
}

/// Forwards events over an unbounded tokio channel
///
/// Sending never blocks, so the reporter can be used from the blocking
/// worker thread while the caller awaits the receiver.
#[derive(Debug, Clone)]
pub struct ChannelProgressReporter {
    sender: UnboundedSender<JobEvent>,
}

impl ChannelProgressReporter {
    /// Create a reporter and the receiving end of its channel
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<JobEvent>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressReporter for ChannelProgressReporter {
    fn report(&self, event: JobEvent) {
        // A dropped receiver means nobody is listening any more
        let _ = self.sender.send(event);
    }
}

/// Per-job progress bookkeeping
///
/// Keeps progress monotonic and guarantees at most one terminal event.
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    start_time: Instant,
    state: Option<JobState>,
    last_progress: u8,
    terminated: bool,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            state: None,
            last_progress: 0,
            terminated: false,
        }
    }

    /// Tracker that discards everything
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Arc::new(NoOpProgressReporter))
    }

    /// Enter a new state
    pub fn set_state(&mut self, state: JobState) {
        self.state = Some(state);
        self.reporter.report(JobEvent::State(state));
    }

    /// Report a progress percentage; values are clamped to 100 and never go backwards
    pub fn progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent < self.last_progress {
            return;
        }
        self.last_progress = percent;
        self.reporter.report(JobEvent::Progress(percent));
    }

    /// Progress after `done` of `total` frames, scaled into `0..=ceiling`
    pub fn fractional(&mut self, done: usize, total: usize, ceiling: u8) {
        if total == 0 {
            return;
        }
        let pct = (done as f64 / total as f64 * f64::from(ceiling)) as u8;
        self.progress(pct);
    }

    /// Emit the terminal success event
    pub fn finished(&mut self, output: PathBuf) {
        if self.terminate() {
            self.reporter.report(JobEvent::Finished(output));
        }
    }

    /// Emit the terminal failure event
    pub fn error(&mut self, message: String) {
        if self.terminate() {
            self.reporter.report(JobEvent::Error(message));
        }
    }

    fn terminate(&mut self) -> bool {
        if self.terminated {
            log::debug!("Ignoring second terminal event");
            return false;
        }
        self.terminated = true;
        true
    }

    #[must_use]
    pub fn state(&self) -> Option<JobState> {
        self.state
    }

    #[must_use]
    pub fn last_progress(&self) -> u8 {
        self.last_progress
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &self.state)
            .field("last_progress", &self.last_progress)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<JobEvent>>);

    impl ProgressReporter for Recording {
        fn report(&self, event: JobEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let recording = Arc::new(Recording::default());
        let mut tracker = ProgressTracker::new(recording.clone());

        tracker.progress(30);
        tracker.progress(10);
        tracker.progress(250);

        let events = recording.0.lock().unwrap().clone();
        assert_eq!(events, vec![JobEvent::Progress(30), JobEvent::Progress(100)]);
        assert_eq!(tracker.last_progress(), 100);
    }

    #[test]
    fn test_single_terminal_event() {
        let recording = Arc::new(Recording::default());
        let mut tracker = ProgressTracker::new(recording.clone());

        tracker.set_state(JobState::Running);
        tracker.error("boom".to_string());
        tracker.finished(PathBuf::from("/tmp/out.png"));

        let events = recording.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                JobEvent::State(JobState::Running),
                JobEvent::Error("boom".to_string())
            ]
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[test]
    fn test_fractional_progress() {
        let recording = Arc::new(Recording::default());
        let mut tracker = ProgressTracker::new(recording.clone());
        for i in 0..12 {
            tracker.fractional(i + 1, 12, 90);
        }
        let events = recording.0.lock().unwrap().clone();
        assert_eq!(events.first(), Some(&JobEvent::Progress(7)));
        assert_eq!(events.last(), Some(&JobEvent::Progress(90)));
        assert_eq!(events.len(), 12);
    }

    #[test]
    fn test_channel_reporter() {
        let (reporter, mut receiver) = ChannelProgressReporter::channel();
        reporter.report(JobEvent::Progress(50));
        reporter.report(JobEvent::Finished(PathBuf::from("x.png")));

        assert_eq!(receiver.try_recv().unwrap(), JobEvent::Progress(50));
        assert!(receiver.try_recv().unwrap().is_terminal());

        drop(receiver);
        // Sending after the receiver is gone is not an error
        reporter.report(JobEvent::Progress(60));
    }

    #[test]
    fn test_state_descriptions() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert_eq!(JobState::Protecting.description(), "Backing up original");
    }
}
