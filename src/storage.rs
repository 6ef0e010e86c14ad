use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const NOTIFICATION_SLOT: &str = "notification-storage";
pub const SETTINGS_SLOT: &str = "settings-storage";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access slot file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("slot file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Named JSON slots kept side by side in one data directory.
#[derive(Debug, Clone)]
pub struct SlotStore {
    dir: PathBuf,
}

impl SlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn slot_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Reads a slot, falling back to `T::default()` when it was never written.
    pub fn load<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, StorageError> {
        let path = self.slot_path(name);
        if !path.exists() {
            debug!(slot = name, "slot not found, using defaults");
            return Ok(T::default());
        }
        read_json(&path)
    }

    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let path = self.slot_path(name);
        write_json(&path, value)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let raw = fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes to a sibling temp file, then renames it over the slot.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let io_err = |source: std::io::Error| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let body = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn missing_slot_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SlotStore::new(dir.path());
        let loaded: Sample = store.load("absent").unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn saved_slot_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SlotStore::new(dir.path().join("nested"));
        let value = Sample {
            name: "theme".to_string(),
            count: 3,
        };
        store.save("sample", &value).unwrap();
        assert!(store.slot_path("sample").exists());
        let loaded: Sample = store.load("sample").unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn corrupt_slot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SlotStore::new(dir.path());
        fs::write(store.slot_path("broken"), "{not json").unwrap();
        let result: Result<Sample, _> = store.load("broken");
        assert!(matches!(result, Err(StorageError::Json { .. })));
    }
}
