//! Progress bar reporter for the command line

use crate::services::{JobEvent, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Renders one job's events on an indicatif bar (0-100)
pub(crate) struct BarProgressReporter {
    bar: ProgressBar,
}

impl BarProgressReporter {
    pub(crate) fn new(input: &Path) -> anyhow::Result<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
            )?
            .progress_chars("#>-"),
        );
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        bar.set_prefix(name.clone());
        bar.set_message(name);
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarProgressReporter {
    fn report(&self, event: JobEvent) {
        match event {
            JobEvent::State(state) => {
                self.bar
                    .set_message(format!("{} ({})", self.bar.prefix(), state.description()));
            },
            JobEvent::Progress(pct) => self.bar.set_position(u64::from(pct)),
            JobEvent::Finished(path) => {
                self.bar
                    .finish_with_message(format!("✅ {}", path.display()));
            },
            JobEvent::Error(message) => {
                self.bar.abandon_with_message(format!("❌ {}", message));
            },
        }
    }
}
