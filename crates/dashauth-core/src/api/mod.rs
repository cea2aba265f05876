//! HTTP boundary for the OAuth2 token and registration endpoints.
//!
//! This module provides the `Transport` trait the session manager sends
//! requests through, the reqwest-backed `ReqwestTransport`, and the
//! `AuthError` taxonomy every auth operation reports.

pub mod error;
pub mod transport;

pub use error::AuthError;
pub use transport::{HttpReply, ReqwestTransport, Transport};
