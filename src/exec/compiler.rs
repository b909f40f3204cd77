/// Compiler Invoker
///
/// Builds a native executable from inline C source. The compile step never goes
/// through the wrapper; a non-zero compiler exit is an environment failure.
use crate::config::types::{HarnessConfig, HarnessError, Result};
use crate::safety::artifact::{self, ScopedArtifact};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Flags appended after `CFLAGS` on every compile
pub const BASE_FLAGS: &str = "-Os -Wall";

/// How many trailing stderr lines to keep in a compile failure
const STDERR_TAIL_LINES: usize = 20;

/// One compile step: source text, the binary path it targets, and the command
/// template it is built with.
///
/// The output path is reserved but not created; [`compile`] claims it, so each spec
/// builds at most once.
#[derive(Clone, Debug)]
pub struct CompileSpec {
    pub source: String,
    pub output: PathBuf,
    pub cc: String,
    pub cflags: String,
    pub shell: PathBuf,
}

impl CompileSpec {
    pub fn new(config: &HarnessConfig, source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output: artifact::unique_path(&config.temp_dir, ""),
            cc: config.cc.clone(),
            cflags: config.cflags.clone(),
            shell: config.shell.clone(),
        }
    }

    /// `<CC> <CFLAGS> -Os -Wall <source> -o <output>`
    pub fn command_line(&self, source: &Path) -> String {
        let mut parts = vec![self.cc.as_str()];
        if !self.cflags.trim().is_empty() {
            parts.push(self.cflags.trim());
        }
        parts.push(BASE_FLAGS);
        format!(
            "{} {} -o {}",
            parts.join(" "),
            source.display(),
            self.output.display()
        )
    }
}

/// A compiled binary together with the source it was built from
#[derive(Debug)]
pub struct CompiledBinary {
    source: ScopedArtifact,
    binary: ScopedArtifact,
}

impl CompiledBinary {
    pub fn path(&self) -> &Path {
        self.binary.path()
    }

    pub fn source_path(&self) -> &Path {
        self.source.path()
    }

    /// Release both artifacts now, returning any that debug mode retains
    pub fn release(mut self) -> Vec<PathBuf> {
        self.source
            .release()
            .into_iter()
            .chain(self.binary.release())
            .collect()
    }
}

/// Compile `spec` into artifacts owned by the returned guard
pub fn compile(config: &HarnessConfig, spec: &CompileSpec) -> Result<CompiledBinary> {
    let source = ScopedArtifact::for_config(config, ".c", Some(&spec.source))?;
    let binary = ScopedArtifact::for_config_at(config, spec.output.clone(), None)?;

    let command_line = spec.command_line(source.path());
    log::debug!("Compiling: {}", command_line);

    let output = Command::new(&spec.shell)
        .arg("-c")
        .arg(&command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            HarnessError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to spawn compiler shell {}: {}", spec.shell.display(), e),
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        return Err(HarnessError::CompileFailed {
            command: command_line,
            exit_code: output.status.code().unwrap_or(-1),
            stderr: tail,
        });
    }

    log::debug!("Compiled {}", binary.path().display());
    Ok(CompiledBinary { source, binary })
}
