//! Test harness
//!
//! [`Harness`] owns the resolved configuration and the process runner; scenario
//! bodies receive it explicitly together with a [`TestContext`] carrying the
//! artifacts that enclosing stages provisioned.

pub mod layers;

use crate::config::types::{HarnessConfig, HarnessError, Result};
use crate::exec::runner::{CommandInvocation, CommandOutcome, ProcessRunner};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Artifact name under which the compile stage publishes its binary
pub const COMPILED: &str = "compiled";

/// Runtime a scenario may need beyond the shell
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Runtime {
    Python,
    Node,
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Runtime::Python => write!(f, "python"),
            Runtime::Node => write!(f, "node"),
        }
    }
}

/// Entry point for scenario bodies
#[derive(Clone, Debug)]
pub struct Harness {
    config: HarnessConfig,
    runner: ProcessRunner,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        let runner = ProcessRunner::new(&config);
        Self { config, runner }
    }

    /// Resolve the configuration from the environment and validate it
    pub fn from_env() -> Result<Self> {
        let config = HarnessConfig::from_env();
        config.validate()?;
        if !config.is_wrapped() {
            log::warn!(
                "{} is not set; commands run unwrapped and exercise no interception",
                crate::config::env::WRAPPER_VAR
            );
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    /// Run `command` (wrapped when configured) and expect exit code 0
    pub fn system(&self, command: impl Into<String>) -> Result<CommandOutcome> {
        self.run(&CommandInvocation::new(command))
    }

    /// Run `command` and expect `code`
    pub fn system_expect(&self, command: impl Into<String>, code: i32) -> Result<CommandOutcome> {
        self.run(&CommandInvocation::new(command).expect_code(code))
    }

    /// Run `command`, expect exit code 0 and return its stdout
    pub fn output(&self, command: impl Into<String>) -> Result<String> {
        let outcome = self.run(&CommandInvocation::new(command).capture_stdout())?;
        Ok(outcome.stdout.unwrap_or_default())
    }

    pub fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutcome> {
        self.runner.system(invocation)
    }

    /// Interpreter command for `runtime`
    pub fn interpreter(&self, runtime: Runtime) -> &str {
        match runtime {
            Runtime::Python => &self.config.python,
            Runtime::Node => &self.config.node,
        }
    }

    /// Probe for `runtime` outside the wrapper; a missing runtime skips the scenario
    pub fn require(&self, runtime: Runtime) -> Result<()> {
        let interpreter = self.interpreter(runtime);
        let probe = format!("{} --version >/dev/null 2>&1", interpreter);
        let available = Command::new(&self.config.shell)
            .arg("-c")
            .arg(&probe)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        if available {
            Ok(())
        } else {
            log::warn!("ignoring {} scenario: `{}` not found", runtime, interpreter);
            Err(HarnessError::RuntimeUnavailable(format!(
                "{} interpreter `{}` not found",
                runtime, interpreter
            )))
        }
    }
}

/// Named artifacts injected by enclosing stages, the keyword arguments of a body
#[derive(Debug, Default)]
pub struct TestContext {
    artifacts: BTreeMap<String, PathBuf>,
    retained: Vec<PathBuf>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, path: PathBuf) {
        self.artifacts.insert(name.into(), path);
    }

    pub fn remove(&mut self, name: &str) -> Option<PathBuf> {
        self.artifacts.remove(name)
    }

    /// Path of the artifact published under `name`
    pub fn artifact(&self, name: &str) -> Result<&Path> {
        self.artifacts
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| HarnessError::MissingArtifact(name.to_string()))
    }

    /// Path of the binary built by an enclosing compile stage
    pub fn compiled(&self) -> Result<&Path> {
        self.artifact(COMPILED)
    }

    /// Record artifacts that debug mode kept on disk
    pub fn retain(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.retained.extend(paths);
    }

    pub fn retained(&self) -> &[PathBuf] {
        &self.retained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_unwrapped() {
        let harness = Harness::new(HarnessConfig::default());
        assert!(harness.system("true").is_ok());
        assert!(harness.system_expect("exit 7", 7).is_ok());
        assert!(matches!(
            harness.system("exit 7"),
            Err(HarnessError::ExitCodeMismatch { observed: 7, .. })
        ));
    }

    #[test]
    fn test_output_captures_stdout() {
        let harness = Harness::new(HarnessConfig::default());
        assert_eq!(harness.output("printf 'a b'").unwrap(), "a b");
    }

    #[test]
    fn test_require_missing_runtime_skips() {
        let mut config = HarnessConfig::default();
        config.node = "no-such-node-binary".to_string();
        let harness = Harness::new(config);
        let err = harness.require(Runtime::Node).unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn test_context_artifacts() {
        let mut ctx = TestContext::new();
        assert!(matches!(
            ctx.compiled(),
            Err(HarnessError::MissingArtifact(_))
        ));
        ctx.insert(COMPILED, PathBuf::from("/tmp/bin"));
        assert_eq!(ctx.compiled().unwrap(), Path::new("/tmp/bin"));
        assert_eq!(ctx.remove(COMPILED), Some(PathBuf::from("/tmp/bin")));
        assert!(ctx.artifact(COMPILED).is_err());
    }
}
