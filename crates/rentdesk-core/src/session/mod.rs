//! Authenticated HTTP session lifecycle.
//!
//! - `SessionClient`: bearer attachment, expiry detection, single-flight
//!   refresh and request replay
//! - `SessionEvent`: login / refresh / termination notifications for the host

pub mod client;
pub mod events;
mod gate;

pub use client::SessionClient;
pub use events::{SessionEvent, SessionEvents, TerminationReason};
