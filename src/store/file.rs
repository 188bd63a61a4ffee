//! File-backed credential store using local JSON storage.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing::{debug, error, warn};

use super::CredentialStore;
use crate::error::StoreError;

/// Credentials file name.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Get the default path to the credentials file.
pub fn default_credentials_path() -> Option<PathBuf> {
    ProjectDirs::from("app", "suatalk", "suatalk")
        .map(|dirs| dirs.config_dir().join(CREDENTIALS_FILE))
}

/// Credential store persisted as a JSON document on disk.
///
/// The whole document is rewritten on every mutation. Credentials are a
/// handful of short strings, so this stays simple and crash-safe enough.
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open a store at the given path, loading any existing document.
    ///
    /// A missing or corrupted file yields an empty store rather than an error,
    /// matching a fresh sign-in state.
    pub fn open(path: PathBuf) -> Self {
        let values = load_document(&path);
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    /// Open a store at the platform config directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let path = default_credentials_path().ok_or_else(|| {
            StoreError::StoreFailed("Could not determine config directory".to_string())
        })?;
        Ok(Self::open(path))
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), StoreError> {
        // Create parent directories if they don't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::StoreFailed(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(values)
            .map_err(|e| StoreError::StoreFailed(e.to_string()))?;

        fs::write(&self.path, content).map_err(|e| StoreError::StoreFailed(e.to_string()))?;

        debug!("Saved credentials to {:?}", self.path);
        Ok(())
    }
}

/// Load the credentials document from disk.
///
/// Returns an empty map if the file doesn't exist or is corrupted.
fn load_document(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        debug!("Credentials file does not exist, starting empty");
        return HashMap::new();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(values) => {
                debug!("Loaded credentials from {:?}", path);
                values
            }
            Err(e) => {
                error!("Failed to parse credentials file: {}, starting empty", e);
                HashMap::new()
            }
        },
        Err(e) => {
            warn!("Failed to read credentials file: {}, starting empty", e);
            HashMap::new()
        }
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|e| StoreError::RetrieveFailed(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| StoreError::StoreFailed(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| StoreError::DeleteFailed(e.to_string()))?;
        if values.remove(key).is_some() {
            self.persist(&values)
                .map_err(|e| StoreError::DeleteFailed(e.to_string()))?;
        }
        Ok(())
    }
}
