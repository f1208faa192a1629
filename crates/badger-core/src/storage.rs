//! Persistent storage for the directory tree.
//!
//! The whole tree is kept as a single pretty-printed JSON document. Writes go
//! to a sibling temporary file first and are then renamed into place, so a
//! crash never leaves a truncated document behind.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// File name of the persisted tree inside the data directory.
pub const DIRECTORY_FILE: &str = "directory.json";

/// Errors from reading or writing the persisted tree.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform data directory could not be determined.
    #[error("Cannot determine data directory")]
    NoDataDir,

    /// The data directory could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDirError {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The tree file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    ReadError {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The tree file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The tree file is not valid JSON.
    #[error("Failed to parse {}: {source}", path.display())]
    ParseError {
        /// File that could not be parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The tree could not be serialized.
    #[error("Failed to serialize directory: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Storage backend for the directory tree.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Create a storage instance rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Storage in the platform default data directory.
    ///
    /// On Linux: `/var/lib/badger/`
    /// Elsewhere: the user data directory for `badger`.
    pub fn default_location() -> Result<Self, StorageError> {
        default_data_dir().map(Self::new)
    }

    /// Directory holding the data files.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the persisted tree.
    #[must_use]
    pub fn tree_path(&self) -> PathBuf {
        self.data_dir.join(DIRECTORY_FILE)
    }

    /// Load the persisted tree, `None` if nothing has been saved yet.
    pub fn load_tree(&self) -> Result<Option<Value>, StorageError> {
        let path = self.tree_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|source| StorageError::ReadError {
            path: path.clone(),
            source,
        })?;
        let tree = serde_json::from_str(&content)
            .map_err(|source| StorageError::ParseError { path, source })?;
        Ok(Some(tree))
    }

    /// Replace the persisted tree.
    pub fn save_tree(&self, tree: &Value) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| {
            StorageError::CreateDirError {
                path: self.data_dir.clone(),
                source,
            }
        })?;

        let path = self.tree_path();
        let staging = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tree)?;
        std::fs::write(&staging, content).map_err(|source| StorageError::WriteError {
            path: staging.clone(),
            source,
        })?;
        std::fs::rename(&staging, &path)
            .map_err(|source| StorageError::WriteError { path, source })
    }
}

/// Platform default data directory.
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    #[cfg(target_os = "linux")]
    {
        Ok(PathBuf::from("/var/lib/badger"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "badger")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(StorageError::NoDataDir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_tree_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        assert!(storage.load_tree().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_tree() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("nested"));
        let tree = json!({ "users": { "abc": { "name": "Ana" } } });

        storage.save_tree(&tree).unwrap();

        assert!(storage.tree_path().exists());
        assert!(!storage.tree_path().with_extension("json.tmp").exists());
        assert_eq!(storage.load_tree().unwrap(), Some(tree));
    }

    #[test]
    fn test_corrupt_tree_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        std::fs::write(storage.tree_path(), "{ not json").unwrap();

        assert!(matches!(
            storage.load_tree(),
            Err(StorageError::ParseError { .. })
        ));
    }

    #[test]
    fn test_default_data_dir_is_not_empty() {
        let dir = default_data_dir().unwrap();
        assert!(!dir.as_os_str().is_empty());
    }
}
