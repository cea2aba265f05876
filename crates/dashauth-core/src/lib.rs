//! dashauth core - session and credential lifecycle for the admin dashboard.
//!
//! Authenticates against an OAuth2 token endpoint, persists the resulting
//! token pair in a local storage scope, renews it with the refresh token on
//! request, and answers "is the user logged in?" for the rest of the app.

pub mod api;
pub mod auth;
pub mod config;
pub mod storage;

pub use api::{AuthError, HttpReply, ReqwestTransport, Transport};
pub use auth::{CredentialStore, RegistrationProfile, Session, SessionData, SessionManager};
pub use config::AuthConfig;
pub use storage::{FileStorage, MemoryStorage, Storage};
