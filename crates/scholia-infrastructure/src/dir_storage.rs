//! Directory-backed key-value storage.
//!
//! Persists each key as one file under a base directory, mirroring the
//! string-valued storage contract the session layers are written against.
//! Reads degrade to `None`; write failures are mapped into the
//! `StorageError` taxonomy for the caller's error sink.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use scholia_core::storage::{KeyValueStorage, StorageError};

/// File-per-key storage rooted at a base directory.
///
/// Layout:
/// ```text
/// base_dir/
/// ├── scholia.sessions.kv
/// ├── scholia.session.<id>.kv
/// └── scholia.current-session.kv
/// ```
pub struct DirStorage {
    base_dir: PathBuf,
}

impl DirStorage {
    /// Creates a `DirStorage` rooted at `base_dir`, creating the directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).context("Failed to create storage directory")?;
        Ok(Self { base_dir })
    }

    /// Creates a `DirStorage` at the default location
    /// (`~/.local/share/scholia`).
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined or
    /// created.
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir().context("Failed to get data directory")?;
        Self::new(data_dir.join("scholia"))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys are dotted identifiers; anything outside the expected
        // alphabet is mapped to '-' so a key can never escape base_dir.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.base_dir.join(format!("{}.kv", safe))
    }
}

impl KeyValueStorage for DirStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key);
        fs::write(&path, value).map_err(|err| match err.kind() {
            ErrorKind::StorageFull | ErrorKind::QuotaExceeded => {
                StorageError::QuotaExceeded(err.to_string())
            }
            _ => StorageError::Unknown(format!("{:?}: {}", path, err)),
        })
    }

    fn remove(&self, key: &str) {
        let path = self.key_path(key);
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != ErrorKind::NotFound {
                warn!(?path, %err, "failed to remove storage key");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_get_remove_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirStorage::new(temp_dir.path()).unwrap();

        storage.set("scholia.session.abc", "{\"id\":\"abc\"}").unwrap();
        assert_eq!(
            storage.get("scholia.session.abc"),
            Some("{\"id\":\"abc\"}".to_string())
        );

        storage.remove("scholia.session.abc");
        assert_eq!(storage.get("scholia.session.abc"), None);
    }

    #[test]
    fn missing_key_reads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirStorage::new(temp_dir.path()).unwrap();
        assert_eq!(storage.get("scholia.absent"), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirStorage::new(temp_dir.path()).unwrap();
        storage.remove("scholia.absent");
        storage.remove("scholia.absent");
    }

    #[test]
    fn hostile_keys_stay_inside_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DirStorage::new(temp_dir.path()).unwrap();

        storage.set("../escape", "value").unwrap();
        assert_eq!(storage.get("../escape"), Some("value".to_string()));

        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn values_survive_reopening() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = DirStorage::new(temp_dir.path()).unwrap();
            storage.set("scholia.sessions", "[]").unwrap();
        }
        let reopened = DirStorage::new(temp_dir.path()).unwrap();
        assert_eq!(reopened.get("scholia.sessions"), Some("[]".to_string()));
    }
}
