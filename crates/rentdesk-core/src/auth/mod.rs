//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `CredentialStore`: the access/refresh token pair, kept consistent
//! - `TokenStorage` backends: in memory, a JSON session file, or the OS keychain
//! - `AuthService`: login, registration, logout and "who am I"
//!
//! Absence of either token means the user is logged out.

pub mod credentials;
pub mod keychain;
pub mod service;
pub mod session;
pub mod storage;

pub use credentials::{CredentialBackend, CredentialPair, CredentialStore};
pub use keychain::KeyringStorage;
pub use service::AuthService;
pub use session::FileStorage;
pub use storage::{MemoryStorage, StoreError, TokenKey, TokenStorage};
