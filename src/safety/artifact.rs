/// Scoped ephemeral artifacts
///
/// Every file created here is owned by exactly one guard and removed when the guard
/// drops, on success and on failure alike. Debug mode retains the file instead and
/// reports its path.
use crate::config::types::{HarnessConfig, HarnessError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name prefix for every artifact the harness creates
pub const ARTIFACT_PREFIX: &str = "fcharness-";

/// Fresh artifact path in `dir`; nothing is created until a guard claims it
pub fn unique_path(dir: &Path, suffix: &str) -> PathBuf {
    dir.join(format!("{}{}{}", ARTIFACT_PREFIX, Uuid::new_v4(), suffix))
}

/// Uniquely named temporary file with guaranteed cleanup
#[derive(Debug)]
pub struct ScopedArtifact {
    path: PathBuf,
    keep: bool,
    released: bool,
}

impl ScopedArtifact {
    /// Create an empty artifact with the given suffix (e.g. `.c`, `.py`, or `""`)
    pub fn create(dir: &Path, suffix: &str) -> Result<Self> {
        Self::create_with(dir, suffix, None)
    }

    /// Create an artifact pre-populated with `content`
    pub fn with_content(dir: &Path, suffix: &str, content: &str) -> Result<Self> {
        Self::create_with(dir, suffix, Some(content))
    }

    /// Create an executable script artifact
    #[cfg(unix)]
    pub fn executable(dir: &Path, suffix: &str, content: &str) -> Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        let artifact = Self::create_with(dir, suffix, Some(content))?;
        fs::set_permissions(&artifact.path, fs::Permissions::from_mode(0o755)).map_err(|e| {
            HarnessError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to mark {} executable: {}", artifact.path.display(), e),
            ))
        })?;
        Ok(artifact)
    }

    /// Create an artifact honouring the configured directory and debug flag
    pub fn for_config(config: &HarnessConfig, suffix: &str, content: Option<&str>) -> Result<Self> {
        Self::for_config_at(config, unique_path(&config.temp_dir, suffix), content)
    }

    /// Claim a path chosen up front (see [`unique_path`]) under the debug flag
    pub fn for_config_at(config: &HarnessConfig, path: PathBuf, content: Option<&str>) -> Result<Self> {
        let mut artifact = Self::create_at(path, content)?;
        artifact.keep = config.debug;
        Ok(artifact)
    }

    fn create_with(dir: &Path, suffix: &str, content: Option<&str>) -> Result<Self> {
        Self::create_at(unique_path(dir, suffix), content)
    }

    fn create_at(path: PathBuf, content: Option<&str>) -> Result<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                HarnessError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create artifact {}: {}", path.display(), e),
                ))
            })?;

        // Guard exists before the write so a failed write still cleans up
        let artifact = Self {
            path,
            keep: false,
            released: false,
        };

        if let Some(content) = content {
            file.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
        }

        log::debug!("Created artifact {}", artifact.path.display());
        Ok(artifact)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Retain the file past the guard's lifetime
    pub fn keep(&mut self) {
        self.keep = true;
    }

    pub fn is_kept(&self) -> bool {
        self.keep
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Remove the file now. Returns the path when it is retained.
    ///
    /// Only the first call acts; later calls (including the one from `Drop`) report
    /// the same result without touching the filesystem again.
    pub fn release(&mut self) -> Option<PathBuf> {
        if self.released {
            return self.keep.then(|| self.path.clone());
        }
        self.released = true;

        if self.keep {
            log::info!("Keeping artifact {} for inspection", self.path.display());
            return Some(self.path.clone());
        }

        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("Failed to remove artifact {}: {}", self.path.display(), e);
            } else {
                log::debug!("Removed artifact {}", self.path.display());
            }
        }
        None
    }
}

impl Drop for ScopedArtifact {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
