//! Durable slot for the authentication-state blob
//!
//! A single JSON file, overwritten atomically on every successful login. A
//! missing or unreadable file means "never authenticated".

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::browsing::AuthState;
use crate::scrape_engine::ScrapeError;

#[derive(Debug, Clone)]
pub struct AuthStateStore {
    path: PathBuf,
}

impl AuthStateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state
    ///
    /// An unreadable or corrupt file is logged and treated as absent so the
    /// next acquire logs in fresh and overwrites it.
    pub fn load(&self) -> Result<Option<AuthState>, ScrapeError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!("Ignoring unreadable auth state {}: {e}", self.path.display());
                return Ok(None);
            }
        };
        match serde_json::from_slice::<AuthState>(&raw) {
            Ok(state) => {
                debug!(
                    "Loaded auth state captured at {} from {}",
                    state.captured_at,
                    self.path.display()
                );
                Ok(Some(state))
            }
            Err(e) => {
                warn!("Ignoring corrupt auth state {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    /// Overwrite the slot via temp file and rename
    pub fn save(&self, state: &AuthState) -> Result<(), ScrapeError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut temp_file = NamedTempFile::new_in(&parent)?;
        serde_json::to_writer_pretty(&mut temp_file, state)?;
        temp_file.flush()?;
        temp_file.persist(&self.path).map_err(|e| e.error)?;
        debug!("Persisted auth state to {}", self.path.display());
        Ok(())
    }

    /// Forget the persisted state
    pub fn clear(&self) -> Result<(), ScrapeError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_means_no_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AuthStateStore::new(dir.path().join("auth.json"));
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn save_overwrites_previous_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AuthStateStore::new(dir.path().join("nested").join("auth.json"));

        store.save(&AuthState::new(json!({"token": "old"}))).expect("save old");
        store.save(&AuthState::new(json!({"token": "new"}))).expect("save new");

        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded.payload, json!({"token": "new"}));
    }

    #[test]
    fn corrupt_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.json");
        std::fs::write(&path, b"{not json").expect("write");
        assert!(AuthStateStore::new(&path).load().expect("load").is_none());
    }

    #[test]
    fn unreadable_slot_is_treated_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.json");
        std::fs::create_dir(&path).expect("mkdir");
        assert!(AuthStateStore::new(&path).load().expect("load").is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AuthStateStore::new(dir.path().join("auth.json"));
        store.save(&AuthState::new(json!({}))).expect("save");
        store.clear().expect("clear");
        store.clear().expect("clear again");
        assert!(store.load().expect("load").is_none());
    }
}
