use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::keychain::KeyringStorage;
use super::session::FileStorage;
use super::storage::{MemoryStorage, StoreError, TokenKey, TokenStorage};

/// Access and refresh token, always stored and cleared together.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never show up in logs
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Where the credential pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    Memory,
    #[default]
    File,
    Keyring,
}

impl std::str::FromStr for CredentialBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "keyring" | "keychain" => Ok(Self::Keyring),
            other => Err(format!("unknown credential backend: {}", other)),
        }
    }
}

/// Shared handle to the persisted session.
///
/// Clone is cheap; all clones read and write the same storage. Writes made
/// through any clone are serialized.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn TokenStorage>,
    write_lock: Arc<Mutex<()>>,
}

impl CredentialStore {
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Open the configured backend. `session_dir` is only used by the file backend.
    pub fn open(backend: CredentialBackend, session_dir: &Path) -> Self {
        debug!(?backend, "Opening credential store");
        match backend {
            CredentialBackend::Memory => Self::in_memory(),
            CredentialBackend::File => Self::new(FileStorage::new(session_dir)),
            CredentialBackend::Keyring => Self::new(KeyringStorage::new()),
        }
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.storage.get(TokenKey::Access)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.storage.get(TokenKey::Refresh)
    }

    /// Both tokens, or `None` if either one is missing
    pub fn pair(&self) -> Result<Option<CredentialPair>, StoreError> {
        let access = self.access_token()?;
        let refresh = self.refresh_token()?;
        Ok(access.zip(refresh).map(|(a, r)| CredentialPair::new(a, r)))
    }

    /// Replace the stored pair. If only one half could be written the
    /// store is cleared so it never holds a mismatched pair.
    pub fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        let _guard = self.lock_writes();
        self.write_pair(pair)
    }

    /// Replace the stored pair only if the stored refresh token is still
    /// `expected`. Returns `false` without writing when the session was
    /// cleared or replaced in the meantime.
    pub fn save_if_refresh_token(&self, expected: &str, pair: &CredentialPair) -> Result<bool, StoreError> {
        let _guard = self.lock_writes();
        if self.refresh_token()?.as_deref() != Some(expected) {
            debug!("Stored session changed, not saving refreshed pair");
            return Ok(false);
        }
        self.write_pair(pair)?;
        Ok(true)
    }

    fn write_pair(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        if let Err(e) = self.storage.set_pair(&pair.access_token, &pair.refresh_token) {
            warn!(error = %e, "Failed to store credential pair, clearing session");
            if let Err(clear_error) = self.remove_all() {
                warn!(error = %clear_error, "Failed to clear session after partial save");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Remove both tokens. Both removals are attempted even if the first fails.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock_writes();
        self.remove_all()
    }

    /// Clear the session only if it still uses `expected` as access token.
    /// Returns whether anything was cleared.
    pub fn clear_if_access_token(&self, expected: &str) -> Result<bool, StoreError> {
        let _guard = self.lock_writes();
        if self.access_token()?.as_deref() != Some(expected) {
            return Ok(false);
        }
        self.remove_all()?;
        Ok(true)
    }

    fn remove_all(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in TokenKey::ALL {
            if let Err(e) = self.storage.remove(key) {
                warn!(key = key.as_str(), error = %e, "Failed to remove token");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Logged in means both tokens are present. Storage errors count as logged out.
    pub fn is_logged_in(&self) -> bool {
        matches!(self.pair(), Ok(Some(_)))
    }
}
