/// Open file descriptor accounting
///
/// Reads `/proc/self/fd` to detect descriptors leaked by the harness itself across
/// a scenario. Descriptor accounting inside the wrapped process tree is done by the
/// scenario scripts, which report their own counts on stdout.
use crate::config::types::{HarnessError, Result};
use std::fs;

const FD_DIR: &str = "/proc/self/fd";

/// Get the sorted list of open file descriptors
pub fn get_open_fds() -> Result<Vec<i32>> {
    let entries = fs::read_dir(FD_DIR)
        .map_err(|e| HarnessError::Config(format!("Failed to read {}: {}", FD_DIR, e)))?;

    let mut fds: Vec<i32> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| name.parse::<i32>().ok())
        .collect();

    fds.sort_unstable();
    Ok(fds)
}

/// Descriptors open at one point in time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FdSnapshot {
    fds: Vec<i32>,
}

impl FdSnapshot {
    pub fn take() -> Result<Self> {
        Ok(Self {
            fds: get_open_fds()?,
        })
    }

    pub fn count(&self) -> usize {
        self.fds.len()
    }

    /// Descriptors open now that were not open in `earlier`.
    /// The descriptor used to list `/proc/self/fd` is transient and appears in both.
    pub fn leaked_since(&self, earlier: &FdSnapshot) -> Vec<i32> {
        self.fds
            .iter()
            .filter(|fd| earlier.fds.binary_search(fd).is_err())
            .copied()
            .collect()
    }
}
