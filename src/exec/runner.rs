/// Process Runner
///
/// Runs one shell command line per invocation, optionally routed through the wrapper
/// as `<wrapper> -- <command>`, blocks until the shell exits and compares the exit
/// code against the expectation. No timeout is imposed here.
use crate::config::types::{HarnessConfig, HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

/// One command to run and the expectation to check it against
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Shell command line, passed to the wrapper untouched
    pub command: String,
    /// Expected exit code
    pub expected_code: i32,
    /// Capture stdout instead of inheriting it
    pub capture_stdout: bool,
    /// Send stderr to the null device
    pub ignore_stderr: bool,
}

impl CommandInvocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            expected_code: 0,
            capture_stdout: false,
            ignore_stderr: false,
        }
    }

    pub fn expect_code(mut self, code: i32) -> Self {
        self.expected_code = code;
        self
    }

    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    pub fn ignore_stderr(mut self) -> Self {
        self.ignore_stderr = true;
        self
    }
}

/// What a finished invocation looked like
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Command line actually handed to the shell
    pub command_line: String,
    /// Normalised exit code (0-255; `128 + signo` for signal deaths)
    pub exit_code: i32,
    /// Terminating signal, if any
    pub signal: Option<i32>,
    /// Captured stdout when requested
    pub stdout: Option<String>,
    /// Wall time of this invocation
    pub wall_time: Duration,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Captured stdout, empty when capture was not requested
    pub fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }

    /// Human readable termination reason
    pub fn describe(&self) -> String {
        match self.signal {
            Some(sig) => match nix::sys::signal::Signal::try_from(sig) {
                Ok(signal) => format!("killed by {}", signal.as_str()),
                Err(_) => format!("killed by signal {}", sig),
            },
            None => format!("exited with {}", self.exit_code),
        }
    }
}

/// Spawns command lines through the configured shell and wrapper
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    shell: PathBuf,
    wrapper: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            wrapper: config.wrapper_path.clone(),
        }
    }

    /// Final command line for `command`. The command is not escaped: an unescaped
    /// `--` inside it is the caller's problem.
    pub fn command_line(&self, command: &str) -> String {
        match &self.wrapper {
            Some(wrapper) => format!("{} -- {}", wrapper.display(), command),
            None => command.to_string(),
        }
    }

    /// Run the invocation and report what happened, without asserting
    pub fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutcome> {
        let command_line = self.command_line(&invocation.command);
        log::debug!("Running: {}", command_line);

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&command_line)
            .stdin(Stdio::inherit())
            .stderr(if invocation.ignore_stderr {
                Stdio::null()
            } else {
                Stdio::inherit()
            });

        let start = Instant::now();
        let (status, stdout) = if invocation.capture_stdout {
            let output = cmd.stdout(Stdio::piped()).output().map_err(|e| {
                HarnessError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to spawn {}: {}", self.shell.display(), e),
                ))
            })?;
            (
                output.status,
                Some(String::from_utf8_lossy(&output.stdout).to_string()),
            )
        } else {
            let status = cmd.stdout(Stdio::inherit()).status().map_err(|e| {
                HarnessError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to spawn {}: {}", self.shell.display(), e),
                ))
            })?;
            (status, None)
        };
        let wall_time = start.elapsed();

        let (exit_code, signal) = normalize_status(status);
        let outcome = CommandOutcome {
            command_line,
            exit_code,
            signal,
            stdout,
            wall_time,
        };
        log::debug!(
            "`{}` {} after {:.3}s",
            outcome.command_line,
            outcome.describe(),
            wall_time.as_secs_f64()
        );
        Ok(outcome)
    }

    /// Run the invocation and fail unless the exit code matches the expectation
    pub fn system(&self, invocation: &CommandInvocation) -> Result<CommandOutcome> {
        let outcome = self.execute(invocation)?;
        if outcome.exit_code != invocation.expected_code {
            return Err(HarnessError::ExitCodeMismatch {
                command: outcome.command_line,
                expected: invocation.expected_code,
                observed: outcome.exit_code,
            });
        }
        Ok(outcome)
    }
}

/// Exit code plus terminating signal. Signal deaths map to `128 + signo`.
fn normalize_status(status: ExitStatus) -> (i32, Option<i32>) {
    if let Some(code) = status.code() {
        return (code, None);
    }

    #[cfg(unix)]
    {
        if let Some(sig) = status.signal() {
            return (128 + sig, Some(sig));
        }
    }

    (-1, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ProcessRunner {
        ProcessRunner::new(&HarnessConfig::default())
    }

    #[test]
    fn test_command_line_unwrapped() {
        assert_eq!(runner().command_line("sleep 10"), "sleep 10");
    }

    #[test]
    fn test_command_line_wrapped() {
        let config = HarnessConfig::default().with_wrapper("/opt/fluxcapacitor");
        let runner = ProcessRunner::new(&config);
        assert_eq!(
            runner.command_line("bash -c 'sleep 120;'"),
            "/opt/fluxcapacitor -- bash -c 'sleep 120;'"
        );
    }

    #[test]
    fn test_exit_code_propagation() {
        let outcome = runner()
            .system(&CommandInvocation::new("exit 188").expect_code(188))
            .unwrap();
        assert_eq!(outcome.exit_code, 188);
        assert_eq!(outcome.signal, None);
    }

    #[test]
    fn test_mismatch_reports_both_codes() {
        let err = runner().system(&CommandInvocation::new("exit 3")).unwrap_err();
        match err {
            HarnessError::ExitCodeMismatch {
                expected, observed, ..
            } => {
                assert_eq!(expected, 0);
                assert_eq!(observed, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_command_not_found_is_127() {
        let outcome = runner()
            .system(
                &CommandInvocation::new("command_that_doesnt exist")
                    .expect_code(127)
                    .ignore_stderr(),
            )
            .unwrap();
        assert_eq!(outcome.exit_code, 127);
    }

    #[test]
    fn test_capture_stdout() {
        let outcome = runner()
            .system(&CommandInvocation::new("echo first; echo second").capture_stdout())
            .unwrap();
        assert_eq!(outcome.stdout(), "first\nsecond\n");

        let uncaptured = runner().system(&CommandInvocation::new("true")).unwrap();
        assert_eq!(uncaptured.stdout, None);
        assert_eq!(uncaptured.stdout(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_death_is_normalized() {
        let outcome = runner()
            .execute(&CommandInvocation::new("kill -9 $$"))
            .unwrap();
        assert_eq!(outcome.exit_code, 137);
        assert_eq!(outcome.signal, Some(9));
        assert_eq!(outcome.describe(), "killed by SIGKILL");
    }

    #[test]
    fn test_spawn_failure_is_io_error() {
        let mut config = HarnessConfig::default();
        config.shell = PathBuf::from("/nonexistent/shell");
        let err = ProcessRunner::new(&config)
            .execute(&CommandInvocation::new("true"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
