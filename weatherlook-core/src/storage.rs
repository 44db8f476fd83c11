//! Durable key/value storage.
//!
//! Each key is one small JSON document stored in its own file. Writes replace
//! the whole value (temp file + rename), so a reader sees either the old or the
//! new document.

use std::{
    fs, io,
    path::PathBuf,
};

use directories::ProjectDirs;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub const DETECTED_LOCATION_KEY: &str = "detectedLocation";
pub const USER_PROFILE_KEY: &str = "userProfile";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not determine platform data directory")]
    NoDataDir,
    #[error("Storage I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("Corrupt value for '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the platform data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "weatherlook", "weatherlook")
            .ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(dirs.data_dir()))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// `Ok(None)` when nothing was stored under `key` yet.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { key: key.into(), source }),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StorageError::Json { key: key.into(), source })
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io { key: key.into(), source };

        fs::create_dir_all(&self.dir).map_err(io_err)?;

        let json = serde_json::to_string(value)
            .map_err(|source| StorageError::Json { key: key.into(), source })?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;

        tracing::debug!("stored '{key}' at {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DetectedLocation;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(dir.path());

        let value: Option<DetectedLocation> = storage.get(DETECTED_LOCATION_KEY).expect("read");
        assert!(value.is_none());
    }

    #[test]
    fn set_replaces_whole_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(dir.path().join("nested"));

        let first = DetectedLocation { lat: 1.0, lon: 2.0, city: "London".into() };
        let second = DetectedLocation { lat: 48.85, lon: 2.35, city: "Paris".into() };

        storage.set(DETECTED_LOCATION_KEY, &first).expect("write");
        storage.set(DETECTED_LOCATION_KEY, &second).expect("write");

        let loaded: Option<DetectedLocation> = storage.get(DETECTED_LOCATION_KEY).expect("read");
        assert_eq!(loaded, Some(second));
    }

    #[test]
    fn corrupt_value_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(dir.path());
        fs::write(dir.path().join("detectedLocation.json"), "{not json").expect("write");

        let err = storage.get::<DetectedLocation>(DETECTED_LOCATION_KEY).unwrap_err();
        assert!(matches!(err, StorageError::Json { .. }));
    }
}
