use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// The two fixed keys a session is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub const ALL: [TokenKey; 2] = [TokenKey::Access, TokenKey::Refresh];

    pub const fn as_str(self) -> &'static str {
        match self {
            TokenKey::Access => "accessToken",
            TokenKey::Refresh => "refreshToken",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No {0} directory available on this platform")]
    NoDirectory(&'static str),
}

/// A string key/value store that survives restarts (or not, for `MemoryStorage`).
///
/// Implementations only deal with single values; keeping the access and
/// refresh token consistent is the job of [`super::CredentialStore`].
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: TokenKey) -> Result<Option<String>, StoreError>;

    fn set(&self, key: TokenKey, value: &str) -> Result<(), StoreError>;

    /// Removing a key that is not present is not an error
    fn remove(&self, key: TokenKey) -> Result<(), StoreError>;

    /// Write both tokens. Backends that can do it in one step override this
    /// so readers never see half of a pair.
    fn set_pair(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        self.set(TokenKey::Refresh, refresh)?;
        self.set(TokenKey::Access, access)
    }
}

/// Process-local storage, used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<TokenKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<TokenKey, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: TokenKey) -> Result<Option<String>, StoreError> {
        Ok(self.values().get(&key).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<(), StoreError> {
        self.values().insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: TokenKey) -> Result<(), StoreError> {
        self.values().remove(&key);
        Ok(())
    }

    fn set_pair(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        let mut values = self.values();
        values.insert(TokenKey::Access, access.to_string());
        values.insert(TokenKey::Refresh, refresh.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(TokenKey::Access).unwrap(), None);

        storage.set(TokenKey::Access, "A1").unwrap();
        assert_eq!(storage.get(TokenKey::Access).unwrap().as_deref(), Some("A1"));
        assert_eq!(storage.get(TokenKey::Refresh).unwrap(), None);

        storage.remove(TokenKey::Access).unwrap();
        // Removing twice is fine
        storage.remove(TokenKey::Access).unwrap();
        assert_eq!(storage.get(TokenKey::Access).unwrap(), None);
    }

    #[test]
    fn test_memory_storage_set_pair() {
        let storage = MemoryStorage::new();
        storage.set_pair("A1", "R1").unwrap();
        assert_eq!(storage.get(TokenKey::Access).unwrap().as_deref(), Some("A1"));
        assert_eq!(storage.get(TokenKey::Refresh).unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_token_key_names() {
        assert_eq!(TokenKey::Access.as_str(), "accessToken");
        assert_eq!(TokenKey::Refresh.as_str(), "refreshToken");
    }
}
