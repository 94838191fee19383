//! Persisted parsing position
//!
//! The only state kept between runs: where parsing stopped and when the last
//! run happened.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_processed: NaiveDateTime,
    pub last_sync: NaiveDateTime,
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to write checkpoint {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize checkpoint: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage for the checkpoint of the previous run.
pub trait CheckpointStore {
    /// Returns the stored checkpoint. Absence and unreadable data look the same.
    fn load(&self) -> Option<Checkpoint>;

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
}

/// Checkpoint kept as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn discard(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove corrupt checkpoint");
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Option<Checkpoint> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No checkpoint found");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read checkpoint, removing it");
                self.discard();
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt checkpoint, removing it");
                self.discard();
                None
            }
        }
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(checkpoint)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| CheckpointError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        std::fs::write(&self.path, json).map_err(|source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), last_processed = %checkpoint.last_processed, "Checkpoint saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn checkpoint() -> Checkpoint {
        let day = NaiveDate::from_ymd_opt(2025, 7, 16).unwrap();
        Checkpoint {
            last_processed: day.and_hms_opt(9, 30, 0).unwrap(),
            last_sync: day.and_hms_opt(10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoint.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("state").join("checkpoint.json"));

        store.save(&checkpoint()).unwrap();
        assert_eq!(store.load(), Some(checkpoint()));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"last_processed\": \"2025-07-16T09:30:00\""));
    }

    #[test]
    fn corrupt_file_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileCheckpointStore::new(&path);
        assert_eq!(store.load(), None);
        assert!(!path.exists());
    }
}
