/// Tool dependency probing for `check-deps`
use crate::config::types::HarnessConfig;
use serde::Serialize;
use std::process::{Command, Stdio};

/// Probe result for one tool
#[derive(Clone, Debug, Serialize)]
pub struct DependencyStatus {
    /// What the tool is used for
    pub role: &'static str,
    /// Command probed
    pub command: String,
    /// First line of its version output, when it ran
    pub version: Option<String>,
    /// Whether scenarios can run without it (they are skipped instead)
    pub optional: bool,
}

impl DependencyStatus {
    pub fn available(&self) -> bool {
        self.version.is_some()
    }
}

/// Probe every external tool the suite may invoke
pub fn probe_all(config: &HarnessConfig) -> Vec<DependencyStatus> {
    let mut statuses = vec![
        probe("shell", &config.shell.to_string_lossy(), None, false),
        probe("bash", "bash", Some("--version"), false),
        probe("compiler", &config.cc, Some("--version"), false),
        probe("python", &config.python, Some("--version"), true),
        probe("node", &config.node, Some("--version"), true),
    ];

    if let Some(wrapper) = &config.wrapper_path {
        statuses.push(DependencyStatus {
            role: "wrapper",
            command: wrapper.display().to_string(),
            version: wrapper.exists().then(|| "present".to_string()),
            optional: false,
        });
    }

    statuses
}

fn probe(role: &'static str, command: &str, version_arg: Option<&str>, optional: bool) -> DependencyStatus {
    let mut cmd = Command::new(command);
    match version_arg {
        Some(arg) => {
            cmd.arg(arg);
        }
        None => {
            cmd.arg("-c").arg("exit 0");
        }
    }

    let version = match cmd.stdin(Stdio::null()).output() {
        Ok(output) if output.status.success() => {
            let text = if !output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stdout)
            } else {
                String::from_utf8_lossy(&output.stderr)
            };
            let first = text.lines().next().unwrap_or("").trim().to_string();
            Some(if first.is_empty() { "ok".to_string() } else { first })
        }
        Ok(output) => {
            log::debug!("{} probe exited with {:?}", command, output.status.code());
            None
        }
        Err(e) => {
            log::debug!("{} probe failed: {}", command, e);
            None
        }
    };

    DependencyStatus {
        role,
        command: command.to_string(),
        version,
        optional,
    }
}
