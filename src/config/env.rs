/// Environment resolution for harness configuration
///
/// Variables are read exactly once into a [`HarnessConfig`]; nothing else in the
/// crate consults the process environment. Resolution does not log, so callers can
/// resolve before a logger exists.
use crate::config::types::HarnessConfig;
use std::path::PathBuf;

/// Wrapper executable path
pub const WRAPPER_VAR: &str = "FCPATH";
/// Compiler binary
pub const CC_VAR: &str = "CC";
/// Extra compiler flags
pub const CFLAGS_VAR: &str = "CFLAGS";
/// Python interpreter override
pub const PYTHON_VAR: &str = "PYTHON";
/// Node interpreter override
pub const NODE_VAR: &str = "NODE";
/// Debug toggle: retain artifacts, verbose logging
pub const DEBUG_VAR: &str = "FCHARNESS_DEBUG";

impl HarnessConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = HarnessConfig::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        HarnessConfig {
            wrapper_path: non_empty(WRAPPER_VAR).map(PathBuf::from),
            cc: non_empty(CC_VAR).unwrap_or(defaults.cc),
            // CFLAGS may legitimately be blank
            cflags: lookup(CFLAGS_VAR).unwrap_or(defaults.cflags),
            python: non_empty(PYTHON_VAR).unwrap_or(defaults.python),
            node: non_empty(NODE_VAR).unwrap_or(defaults.node),
            debug: lookup(DEBUG_VAR).map(|v| parse_flag(&v)).unwrap_or(false),
            ..defaults
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
