//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `CredentialStore`: single-slot session persistence over a storage scope
//! - `Session` / `SessionData`: the stored token response, present or absent
//! - `SessionManager`: login, registration, refresh and logout
//!
//! Sessions survive restarts and are wiped, along with the rest of the
//! storage scope, on logout.

pub mod session;
pub mod store;

pub use session::{RegistrationProfile, SessionManager};
pub use store::{CredentialStore, Session, SessionData};
