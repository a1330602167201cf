//! Settings persistence.
//!
//! [`Storage`] is a small key/value seam shaped like browser local storage.
//! [`SettingsPersistence`] keeps one JSON blob of [`SettingsState`] under a
//! fixed key and never lets a storage problem escape: reads degrade to
//! "nothing persisted", writes are logged and dropped.

use crate::models::SettingsState;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Storage key for the settings blob
pub const SETTINGS_STORAGE_KEY: &str = "skeuo-settings-state";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Storage quota exceeded")]
    QuotaExceeded,
}

/// Key/value string storage
#[cfg_attr(test, mockall::automock)]
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage backed by one file per key (`<dir>/<key>.json`)
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: Utf8PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`; the directory is created on first write
    pub fn new<P: AsRef<Utf8Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<Utf8PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, value).map_err(|source| StorageError::Io { path, source })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// Process-local storage with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys plus values exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: Mutex::default(),
            quota: Some(bytes),
        }
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(quota) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Load/persist/reset of the settings blob.
///
/// A handle without a backend models an environment with no storage at all:
/// `load` returns `None` and the other operations do nothing.
#[derive(Clone)]
pub struct SettingsPersistence {
    storage: Option<Arc<dyn Storage>>,
    key: String,
}

impl SettingsPersistence {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_key(storage, SETTINGS_STORAGE_KEY)
    }

    pub fn with_key(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage: Some(storage),
            key: key.into(),
        }
    }

    /// Persistence for a headless context with no storage available
    pub fn unavailable() -> Self {
        Self {
            storage: None,
            key: SETTINGS_STORAGE_KEY.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted state.
    ///
    /// Returns `None` when storage is unavailable, nothing is stored, or the
    /// blob cannot be read or parsed.
    pub fn load(&self) -> Option<SettingsState> {
        let storage = self.storage.as_ref()?;

        let raw = match storage.get_item(&self.key) {
            Ok(Some(raw)) if !raw.trim().is_empty() => raw,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!("Failed to read settings from storage: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!("Failed to parse settings from storage: {}", e);
                None
            }
        }
    }

    /// Write the full state. Returns whether the write succeeded; failures are
    /// logged and otherwise ignored.
    pub fn persist(&self, state: &SettingsState) -> bool {
        let Some(storage) = self.storage.as_ref() else {
            return false;
        };

        let serialized = match serde_json::to_string(state) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Failed to serialize settings: {}", e);
                return false;
            }
        };

        match storage.set_item(&self.key, &serialized) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist settings to storage: {}", e);
                false
            }
        }
    }

    /// Remove the persisted blob
    pub fn reset(&self) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };

        if let Err(e) = storage.remove_item(&self.key) {
            tracing::warn!("Failed to clear persisted settings: {}", e);
        }
    }
}

impl std::fmt::Debug for SettingsPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsPersistence")
            .field("available", &self.is_available())
            .field("key", &self.key)
            .finish()
    }
}
