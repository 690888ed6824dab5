//! Wire models for the authentication contract.
//!
//! Only the auth endpoints have a schema this crate relies on:
//!
//! - `LoginRequest`, `RegisterRequest`, `LoginResponse`: session creation
//! - `RefreshRequest`, `RefreshResponse`: access token renewal
//! - `User`: the authenticated account

pub mod auth;

pub use auth::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest, User};
pub(crate) use auth::MeResponse;
