//! Subprocess-backed stage adapters

use super::{CommandRunner, Stage, StageKind, StageParams};
use crate::config::StageCommand;
use std::ffi::OsString;
use std::path::Path;
use tracing::error;

/// A stage implemented by `<interpreter> <script> --input <in> --output <out> [flags]`
#[derive(Debug, Clone)]
pub struct ExternalStage {
    kind: StageKind,
    command: StageCommand,
    runner: CommandRunner,
}

impl ExternalStage {
    #[must_use]
    pub fn new(kind: StageKind, command: StageCommand, runner: CommandRunner) -> Self {
        Self {
            kind,
            command,
            runner,
        }
    }

    /// Full argument list, with unconfigured entries left as `None`
    #[must_use]
    pub fn command_line(
        &self,
        input: &Path,
        output: &Path,
        params: &StageParams,
    ) -> Vec<Option<OsString>> {
        let mut args = vec![
            self.command.interpreter.clone().map(OsString::from),
            self.command.script.clone().map(OsString::from),
            Some(OsString::from("--input")),
            Some(input.as_os_str().to_owned()),
            Some(OsString::from("--output")),
            Some(output.as_os_str().to_owned()),
        ];
        args.extend(params.flags().into_iter().map(Some));
        args
    }
}

impl Stage for ExternalStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn run(&self, input: &Path, output: &Path, params: &StageParams) -> bool {
        if params.kind() != self.kind {
            error!(
                stage = self.kind.name(),
                params = params.kind().name(),
                "Parameters do not belong to this stage"
            );
            return false;
        }
        if self.command.script.is_none() && self.command.interpreter.is_none() {
            error!(stage = self.kind.name(), "Stage is not configured");
            return false;
        }

        self.runner.run(&self.command_line(input, output, params))
    }
}
