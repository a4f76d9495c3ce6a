//! Throwaway Chrome profile directories
//!
//! Each launched browser gets its own uuid-named user-data directory so two
//! runs never fight over a SingletonLock. The directory is removed on drop.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix for every profile directory this crate creates
pub const PROFILE_PREFIX: &str = "kodegen_tagscrape_chrome";

/// RAII guard over a profile directory
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
}

impl BrowserProfile {
    /// Create `<parent>/<prefix>_<uuid>`
    ///
    /// `create_dir` rather than `create_dir_all` so a collision fails instead
    /// of silently sharing a directory.
    pub fn create_in(parent: &Path, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create profile parent: {}", parent.display()))?;
        let path = parent.join(format!("{prefix}_{}", Uuid::new_v4().simple()));
        std::fs::create_dir(&path)
            .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;
        debug!("Created browser profile {}", path.display());
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.path.exists() {
            debug!("Removing browser profile {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(
                    "Failed to remove profile directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}
