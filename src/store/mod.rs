//! Durable credential storage for session tokens and user info.
//!
//! The session owns an injected [`CredentialStore`] implementation; tokens are
//! read back as `Zeroizing<String>` so they are cleared from memory on drop.

pub mod file;

use std::collections::HashMap;
use std::sync::Mutex;

use zeroize::Zeroizing;

use crate::error::StoreError;

/// Storage keys. These match the keys the SuaTalk web client persists, so a
/// store backed by shared state stays compatible with an existing deployment.
pub const KEY_ACCESS_TOKEN: &str = "auth_token";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
pub const KEY_TOKEN_EXPIRATION: &str = "token_expiration";
pub const KEY_USER_ID: &str = "user_id";
pub const KEY_USER_INFO: &str = "user_info";

/// Every key the client manages, in deletion order for sign-out.
pub const ALL_KEYS: [&str; 5] = [
    KEY_ACCESS_TOKEN,
    KEY_REFRESH_TOKEN,
    KEY_TOKEN_EXPIRATION,
    KEY_USER_ID,
    KEY_USER_INFO,
];

/// Key-value storage for credentials.
///
/// Object-safe so the session can hold `Arc<dyn CredentialStore>`.
pub trait CredentialStore: Send + Sync {
    /// Retrieve a value. `Ok(None)` means the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store a value, replacing any previous one.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Retrieve the access token.
///
/// Returns a `Zeroizing<String>` that will be securely cleared when dropped.
pub fn get_access_token(store: &dyn CredentialStore) -> Result<Zeroizing<String>, StoreError> {
    store
        .get(KEY_ACCESS_TOKEN)?
        .map(Zeroizing::new)
        .ok_or(StoreError::NotFound)
}

/// Retrieve the refresh token.
///
/// Returns a `Zeroizing<String>` that will be securely cleared when dropped.
pub fn get_refresh_token(store: &dyn CredentialStore) -> Result<Zeroizing<String>, StoreError> {
    store
        .get(KEY_REFRESH_TOKEN)?
        .map(Zeroizing::new)
        .ok_or(StoreError::NotFound)
}

/// Delete all stored credentials.
///
/// This is used during sign-out to clear all credentials.
pub fn delete_all(store: &dyn CredentialStore) -> Result<(), StoreError> {
    for key in ALL_KEYS {
        store.delete(key)?;
    }
    Ok(())
}

/// Check if any tokens exist in the store.
pub fn has_tokens(store: &dyn CredentialStore) -> bool {
    get_access_token(store).is_ok() || get_refresh_token(store).is_ok()
}

/// In-memory credential store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
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
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| StoreError::DeleteFailed(e.to_string()))?;
        values.remove(key);
        Ok(())
    }
}
