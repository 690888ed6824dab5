//! Rentdesk core - the authenticated session layer of the rentdesk console.
//!
//! Business data (equipment, customers, rentals, maintenance, invoices,
//! reports) is served by the REST backend and passes through this crate as
//! opaque JSON. What lives here is the session lifecycle: credential
//! storage, bearer attachment, single-flight token refresh with request
//! replay, and session termination events for the host application.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod session;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, RefreshError};
pub use auth::{AuthService, CredentialBackend, CredentialPair, CredentialStore};
pub use config::Config;
pub use session::{SessionClient, SessionEvent, TerminationReason};
