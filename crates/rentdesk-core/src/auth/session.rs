use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::storage::{StoreError, TokenKey, TokenStorage};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Distinguishes temp files of storages living in the same process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk layout: the two tokens under their fixed keys, plus when the file
/// was last written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
}

impl SessionFile {
    fn slot(&mut self, key: TokenKey) -> &mut Option<String> {
        match key {
            TokenKey::Access => &mut self.access_token,
            TokenKey::Refresh => &mut self.refresh_token,
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Tokens persisted as JSON in the cache directory.
///
/// Every operation goes to disk, so two processes sharing the directory see
/// each other's logins and logouts. The file is replaced by rename, never
/// truncated in place, so a reader sees either the old or the new session.
pub struct FileStorage {
    path: PathBuf,
    // Serializes reads and read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(SESSION_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the session file was last written, if there is one
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let _guard = self.guard();
        Ok(self.read()?.saved_at)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<SessionFile, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SessionFile::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(file) => Ok(file),
            Err(e) => {
                // A corrupt file means "logged out"; the next write replaces it
                warn!(path = ?self.path, error = %e, "Ignoring unreadable session file");
                Ok(SessionFile::default())
            }
        }
    }

    fn write(&self, file: &SessionFile) -> Result<(), StoreError> {
        if file.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(path = ?self.path, "Session file removed"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(file)?;

        let temp = self.path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(e) = std::fs::write(&temp, contents).and_then(|()| std::fs::rename(&temp, &self.path)) {
            let _ = std::fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut SessionFile)) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut file = self.read()?;
        apply(&mut file);
        file.saved_at = Some(Utc::now());
        self.write(&file)
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: TokenKey) -> Result<Option<String>, StoreError> {
        let _guard = self.guard();
        let mut file = self.read()?;
        Ok(file.slot(key).take())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<(), StoreError> {
        self.update(|file| *file.slot(key) = Some(value.to_string()))
    }

    fn remove(&self, key: TokenKey) -> Result<(), StoreError> {
        self.update(|file| *file.slot(key) = None)
    }

    fn set_pair(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        self.update(|file| {
            file.access_token = Some(access.to_string());
            file.refresh_token = Some(refresh.to_string());
        })
    }
}
