// roadtrip-journal/src/app/storage/mod.rs
//! Secure key-value storage used to persist the session across restarts.
//!
//! This module provides a single trait `SecureStore` and two concrete
//! implementations:
//!
//! - `MemorySecureStore`: process-local map, used by tests and by
//!   `--memory-storage` runs that must not touch the disk.
//! - `FileSecureStore`: stores a single JSON file containing a map of string
//!   keys to string values, in a per-user configuration directory. The file is
//!   read once on open and rewritten after every mutation.
//!
//! Only the auth session service talks to this storage; it keeps the session
//! token and the user id under two separate keys.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Platform storage error: {0}")]
    Platform(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Asynchronous secure key-value store.
///
/// Keys and values are UTF-8 strings.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a string value for a key.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Read a string value for a key. Returns Ok(None) when key is missing.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove a key (no-op if key does not exist).
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

type Entries = HashMap<String, String>;

fn lock(map: &Mutex<Entries>) -> StorageResult<MutexGuard<'_, Entries>> {
    map.lock()
        .map_err(|e| StorageError::Platform(format!("mutex poisoned: {:?}", e)))
}

//
// In-memory implementation
//

/// Process-local storage, lost when the process exits.
#[derive(Default)]
pub struct MemorySecureStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        lock(&self.inner)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(lock(&self.inner)?.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        lock(&self.inner)?.remove(key);
        Ok(())
    }
}

//
// Native file-backed implementation
//
mod file_storage {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    /// File-based storage: stores a single JSON file which is a map of key -> string value.
    ///
    /// Implementation notes:
    /// - On open, the file is read into memory (HashMap).
    /// - Mutations update memory and flush the file back to disk synchronously.
    pub struct FileSecureStore {
        /// Path to the backing JSON file.
        path: PathBuf,
        /// In-memory copy of key -> value
        inner: Mutex<HashMap<String, String>>,
    }

    impl FileSecureStore {
        /// Determine a good default storage file path for the current user.
        /// - On Windows: %APPDATA%/RoadTripJournal/secure-storage.json
        /// - Else: $HOME/.config/roadtrip-journal/secure-storage.json
        pub fn default_storage_path() -> PathBuf {
            if cfg!(windows)
                && let Ok(appdata) = std::env::var("APPDATA")
            {
                return Path::new(&appdata)
                    .join("RoadTripJournal")
                    .join("secure-storage.json");
            }

            if let Ok(home) = std::env::var("HOME") {
                return Path::new(&home)
                    .join(".config")
                    .join("roadtrip-journal")
                    .join("secure-storage.json");
            }

            // Fallback to current directory
            Path::new(".").join("roadtrip-journal-secure-storage.json")
        }

        /// Open (or create) the storage file. `None` selects the default path.
        pub fn open(path: Option<PathBuf>) -> StorageResult<Self> {
            let path = path.unwrap_or_else(Self::default_storage_path);

            if let Some(parent) = path.parent()
                && let Err(e) = fs::create_dir_all(parent)
            {
                return Err(StorageError::Io(format!(
                    "Failed to create storage parent directory: {}",
                    e
                )));
            }

            let mut map: HashMap<String, String> = HashMap::new();
            if path.exists() {
                let s = fs::read_to_string(&path)
                    .map_err(|e| StorageError::Io(format!("Failed to read storage file: {}", e)))?;
                if !s.trim().is_empty() {
                    map = serde_json::from_str(&s).map_err(|e| {
                        StorageError::Json(format!("Failed to parse storage JSON: {}", e))
                    })?;
                }
            }

            tracing::debug!("Opened secure storage at {}", path.display());
            Ok(Self {
                path,
                inner: Mutex::new(map),
            })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn flush_locked(&self, locked: &HashMap<String, String>) -> StorageResult<()> {
            let s = serde_json::to_string_pretty(locked)
                .map_err(|e| StorageError::Json(e.to_string()))?;
            fs::write(&self.path, s).map_err(|e| StorageError::Io(format!("write failed: {}", e)))
        }
    }

    #[async_trait]
    impl SecureStore for FileSecureStore {
        async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            let mut guard = lock(&self.inner)?;
            guard.insert(key.to_string(), value.to_string());
            self.flush_locked(&guard)
        }

        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            Ok(lock(&self.inner)?.get(key).cloned())
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            let mut guard = lock(&self.inner)?;
            if guard.remove(key).is_some() {
                self.flush_locked(&guard)?;
            }
            Ok(())
        }
    }
}

pub use file_storage::FileSecureStore;
