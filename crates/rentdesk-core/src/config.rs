//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! API base URL, request timeout, where the session is persisted and the
//! route hosts send the user to when a session ends.
//!
//! Configuration is stored at `~/.config/rentdesk/config.json`; the
//! `RENTDESK_*` environment variables override it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::transport::REQUEST_TIMEOUT_SECS;
use crate::auth::{CredentialBackend, CredentialStore, StoreError};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "rentdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

const DEFAULT_LOGIN_ROUTE: &str = "/login";

pub const ENV_API_URL: &str = "RENTDESK_API_URL";
pub const ENV_CREDENTIAL_BACKEND: &str = "RENTDESK_CREDENTIAL_BACKEND";
pub const ENV_REQUEST_TIMEOUT: &str = "RENTDESK_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub credential_backend: CredentialBackend,
    /// Where hosts navigate once the session is terminated
    pub login_route: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            credential_backend: CredentialBackend::default(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            debug!(path = %path.display(), "Config loaded");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `RENTDESK_*` overrides. Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(value) = lookup(ENV_CREDENTIAL_BACKEND) {
            match value.parse() {
                Ok(backend) => self.credential_backend = backend,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_CREDENTIAL_BACKEND),
            }
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT) {
            match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!(value = %value, "Ignoring {}", ENV_REQUEST_TIMEOUT),
            }
        }
    }

    /// Timeout for every HTTP call, including token refresh
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the session file
    pub fn session_dir() -> Result<PathBuf, StoreError> {
        let cache_dir = dirs::cache_dir().ok_or(StoreError::NoDirectory("cache"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Open the configured credential backend
    pub fn credential_store(&self) -> Result<CredentialStore, StoreError> {
        let dir = match self.credential_backend {
            CredentialBackend::File => Self::session_dir()?,
            // Unused by the other backends
            CredentialBackend::Memory | CredentialBackend::Keyring => PathBuf::new(),
        };
        Ok(CredentialStore::open(self.credential_backend, &dir))
    }
}
