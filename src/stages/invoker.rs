//! Subprocess execution for external stages

use std::ffi::OsString;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use instant::Instant;
use tracing::{error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for buffered output after a timed-out child is killed
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Captured result of one finished child process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit status, `None` when the process was killed after a timeout
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Exit code 0 and no timeout
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|s| s.success())
    }
}

/// Runs argument lists as blocking child processes
///
/// Unset arguments are dropped before execution, so a stage whose
/// interpreter is not configured still launches its script directly.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child once it has run longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the argument list and report whether it exited with code 0
    ///
    /// Failures (non-zero exit, missing executable, timeout) are logged and
    /// reported as `false`.
    pub fn run(&self, args: &[Option<OsString>]) -> bool {
        match self.execute(args) {
            Ok(output) => {
                if output.success() {
                    if !output.stdout.trim().is_empty() {
                        info!(stdout = %output.stdout.trim(), "Stage output");
                    }
                    if !output.stderr.trim().is_empty() {
                        warn!(stderr = %output.stderr.trim(), "Stage wrote to stderr");
                    }
                    true
                } else if output.timed_out {
                    error!(
                        timeout_secs = self.timeout.map(|t| t.as_secs()),
                        stdout = %output.stdout.trim(),
                        stderr = %output.stderr.trim(),
                        "Stage timed out and was killed"
                    );
                    false
                } else {
                    error!(
                        exit_code = output.status.and_then(|s| s.code()),
                        stdout = %output.stdout.trim(),
                        stderr = %output.stderr.trim(),
                        "Stage failed"
                    );
                    false
                }
            },
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    error!("Executable not found: {}", e);
                } else {
                    error!("Failed to launch stage: {}", e);
                }
                false
            },
        }
    }

    /// Run the argument list and return the captured streams
    ///
    /// # Errors
    /// - The filtered argument list is empty
    /// - The executable cannot be spawned (not found, permission denied)
    pub fn execute(&self, args: &[Option<OsString>]) -> std::io::Result<CommandOutput> {
        let argv: Vec<&OsString> = args.iter().flatten().collect();
        let Some((program, rest)) = argv.split_first() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "empty command line (no executable configured)",
            ));
        };

        info!(
            "Executing: {}",
            argv.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("'{}': {}", program.to_string_lossy(), e),
                )
            })?;

        // Both pipes are drained concurrently so a chatty child never blocks on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (status, timed_out) = match self.timeout {
            Some(limit) => wait_with_timeout(&mut child, limit)?,
            None => (Some(child.wait()?), false),
        };

        // Grandchildren of a killed stage may still hold the pipes open
        let grace = timed_out.then_some(DRAIN_GRACE);
        Ok(CommandOutput {
            status,
            stdout: collect_drain(stdout, grace),
            stderr: collect_drain(stderr, grace),
            timed_out,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<String>> {
    pipe.map(|mut reader| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        rx
    })
}

/// Wait for a drain thread, giving up after `grace` when one is set
fn collect_drain(receiver: Option<Receiver<String>>, grace: Option<Duration>) -> String {
    let Some(receiver) = receiver else {
        return String::new();
    };
    match grace {
        Some(limit) => receiver.recv_timeout(limit).unwrap_or_default(),
        None => receiver.recv().unwrap_or_default(),
    }
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<(Option<ExitStatus>, bool)> {
    let start = Instant::now();

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((Some(status), false));
        }
        if start.elapsed() > timeout {
            child.kill()?;
            let _ = child.wait();
            return Ok((None, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
