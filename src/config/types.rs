/// Core types shared across the harness
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Harness configuration, resolved once per run and threaded explicitly
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// Wrapper executable; `None` runs every command unwrapped
    pub wrapper_path: Option<PathBuf>,
    /// Shell used to interpret command lines
    pub shell: PathBuf,
    /// Compiler binary
    pub cc: String,
    /// Extra compiler flags, passed through verbatim
    pub cflags: String,
    /// Python interpreter used by managed-runtime scenarios
    pub python: String,
    /// Node interpreter used by managed-runtime scenarios
    pub node: String,
    /// Retain ephemeral artifacts and log verbosely
    pub debug: bool,
    /// Directory for ephemeral artifacts
    pub temp_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            wrapper_path: None,
            shell: PathBuf::from("/bin/sh"),
            cc: "cc".to_string(),
            cflags: String::new(),
            python: "python3".to_string(),
            node: "node".to_string(),
            debug: false,
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl HarnessConfig {
    pub fn with_wrapper(mut self, wrapper: impl Into<PathBuf>) -> Self {
        self.wrapper_path = Some(wrapper.into());
        self
    }

    pub fn without_wrapper(mut self) -> Self {
        self.wrapper_path = None;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Whether commands are routed through the wrapper
    pub fn is_wrapped(&self) -> bool {
        self.wrapper_path.is_some()
    }

    /// Reject configurations the harness cannot run with at all
    pub fn validate(&self) -> Result<()> {
        if let Some(wrapper) = &self.wrapper_path {
            if !wrapper.exists() {
                return Err(HarnessError::Config(format!(
                    "wrapper {} does not exist",
                    wrapper.display()
                )));
            }
        }

        if self.cc.trim().is_empty() {
            return Err(HarnessError::Config("compiler name is empty".to_string()));
        }

        if !self.temp_dir.is_dir() {
            return Err(HarnessError::Config(format!(
                "artifact directory {} is not a directory",
                self.temp_dir.display()
            )));
        }

        Ok(())
    }
}

/// Failure classes reported per scenario
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureKind {
    /// Observed exit code, elapsed time or descriptor count differs from expectation
    #[serde(rename = "assertion")]
    Assertion,
    /// The harness could not set the scenario up
    #[serde(rename = "environment")]
    Environment,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Assertion => write!(f, "assertion"),
            FailureKind::Environment => write!(f, "environment"),
        }
    }
}

/// Harness error types
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("`{command}` exited with {observed}, expected {expected}")]
    ExitCodeMismatch {
        command: String,
        expected: i32,
        observed: i32,
    },

    #[error(
        "Task took {:.1}, not {:.1} seconds",
        .elapsed.as_secs_f64(),
        .ceiling.as_secs_f64()
    )]
    TimeCeilingExceeded { elapsed: Duration, ceiling: Duration },

    #[error("compile step `{command}` exited with {exit_code}: {stderr}")]
    CompileFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("artifact `{0}` was not provisioned by an enclosing stage")]
    MissingArtifact(String),

    #[error("Assertion failed: {0}")]
    Assertion(String),
}

impl HarnessError {
    /// Classify the error for reporting. `RuntimeUnavailable` is reported as a skip
    /// by the suite runner and never reaches this classification there.
    pub fn kind(&self) -> FailureKind {
        match self {
            HarnessError::ExitCodeMismatch { .. }
            | HarnessError::TimeCeilingExceeded { .. }
            | HarnessError::Assertion(_) => FailureKind::Assertion,
            HarnessError::Io(_)
            | HarnessError::Config(_)
            | HarnessError::CompileFailed { .. }
            | HarnessError::RuntimeUnavailable(_)
            | HarnessError::MissingArtifact(_) => FailureKind::Environment,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, HarnessError::RuntimeUnavailable(_))
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
