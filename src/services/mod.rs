//! Services shared by the pipelines and frontends

pub mod format;
pub mod io;
pub mod progress;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
pub use progress::{
    ChannelProgressReporter, ConsoleProgressReporter, JobEvent, JobState, NoOpProgressReporter,
    ProgressReporter, ProgressTracker,
};
