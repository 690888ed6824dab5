//! REST API client module for the rentdesk backend.
//!
//! This module provides:
//! - `ApiClient`: typed JSON calls routed through the session pipeline
//! - `Transport` / `HttpTransport`: the raw HTTP exchange
//! - `AuthEndpoint` / `HttpAuthEndpoint`: login, register and refresh,
//!   which bypass the session pipeline
//!
//! The API uses JWT bearer authentication with short-lived access tokens
//! and longer-lived refresh tokens.

pub mod auth_endpoint;
pub mod client;
pub mod error;
pub mod request;
pub mod transport;

pub use auth_endpoint::{AuthEndpoint, HttpAuthEndpoint};
pub use client::ApiClient;
pub use error::{ApiError, RefreshError};
pub use request::{ApiRequest, ApiResponse};
pub use transport::{HttpTransport, Transport};
