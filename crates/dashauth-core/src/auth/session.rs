use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{AuthError, HttpReply, ReqwestTransport, Transport};
use crate::config::AuthConfig;
use crate::storage::Storage;

use super::store::{CredentialStore, Session, SessionData};

/// Registration form as the dashboard collects it.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationProfile {
    /// Document identifier
    pub codigo: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("codigo", &self.codigo)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Registration body as the endpoint expects it.
#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    code: &'a str,
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a RegistrationProfile> for RegisterBody<'a> {
    fn from(profile: &'a RegistrationProfile) -> Self {
        Self {
            code: &profile.codigo,
            email: &profile.email,
            password: &profile.password,
        }
    }
}

/// OAuth2 grant sent to the authorization endpoint.
enum Grant<'a> {
    Password { username: &'a str, password: &'a str },
    RefreshToken { refresh_token: &'a str },
}

impl Grant<'_> {
    fn name(&self) -> &'static str {
        match self {
            Grant::Password { .. } => "password",
            Grant::RefreshToken { .. } => "refresh_token",
        }
    }
}

/// Build an `application/x-www-form-urlencoded` body, percent-encoding every value.
fn encode_form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Orchestrates login, registration, refresh and logout.
///
/// The only component that talks to the authorization endpoint or writes the
/// credential store. Concurrent refreshes are not coalesced: each reads the
/// stored refresh token, sends its own request, and the last write wins.
pub struct SessionManager<T: Transport = ReqwestTransport> {
    config: AuthConfig,
    transport: T,
    store: CredentialStore,
}

impl SessionManager<ReqwestTransport> {
    /// Manager over the reqwest transport.
    pub fn new(config: AuthConfig, storage: Arc<dyn Storage>) -> Result<Self, AuthError> {
        Ok(Self::with_transport(config, ReqwestTransport::new()?, storage))
    }
}

impl<T: Transport> SessionManager<T> {
    pub fn with_transport(config: AuthConfig, transport: T, storage: Arc<dyn Storage>) -> Self {
        Self {
            config,
            transport,
            store: CredentialStore::new(storage),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    // =========================================================================
    // Endpoint operations
    // =========================================================================

    /// Submit a registration. Does not log in and does not touch the store.
    pub async fn register(&self, profile: &RegistrationProfile) -> Result<Value, AuthError> {
        let body = serde_json::to_value(RegisterBody::from(profile))
            .map_err(|e| AuthError::TransportFailure(format!("Failed to encode registration: {}", e)))?;

        let reply = self.transport.post_json(&self.config.register_url, &body).await?;
        let reply = Self::check_reply(reply)?;

        info!(status = reply.status, "Registration submitted");
        Ok(Self::passthrough_body(&reply.body))
    }

    /// Password grant. On success the full token response becomes the session.
    pub async fn login_with_user_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionData, AuthError> {
        let data = self
            .request_tokens(Grant::Password { username, password })
            .await?;
        info!("Login successful");
        Ok(data)
    }

    /// Refresh grant using the stored refresh token.
    ///
    /// Fails with `NoActiveSession` before any request when no refresh token is
    /// stored. A rejected refresh leaves the stored session as it was.
    pub async fn login_with_refresh_token(&self) -> Result<SessionData, AuthError> {
        let refresh_token = self
            .refresh_token()
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::NoActiveSession)?;

        let grant = Grant::RefreshToken {
            refresh_token: refresh_token.as_str(),
        };
        match self.request_tokens(grant).await {
            Ok(data) => {
                info!("Session refreshed");
                Ok(data)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, keeping stored session");
                Err(e)
            }
        }
    }

    async fn request_tokens(&self, grant: Grant<'_>) -> Result<SessionData, AuthError> {
        let body = self.grant_body(&grant);
        debug!(grant = grant.name(), url = %self.config.token_url, "Requesting tokens");

        let reply = self.transport.post_form(&self.config.token_url, body).await?;
        let reply = Self::check_reply(reply)?;

        let value: Value = serde_json::from_str(&reply.body).map_err(|e| {
            AuthError::TransportFailure(format!("Token response is not valid JSON: {}", e))
        })?;
        let data = SessionData::from_value(value).ok_or_else(|| {
            AuthError::TransportFailure("Token response has no access_token".to_string())
        })?;

        // Written only once a complete, well-formed response is in hand
        self.store.save(&data)?;
        Ok(data)
    }

    fn grant_body(&self, grant: &Grant<'_>) -> String {
        let mut pairs: Vec<(&str, &str)> = vec![
            ("grant_type", grant.name()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        match *grant {
            Grant::Password { username, password } => {
                pairs.push(("username", username));
                pairs.push(("password", password));
            }
            Grant::RefreshToken { refresh_token } => {
                pairs.push(("refresh_token", refresh_token));
            }
        }
        pairs.push(("scope", self.config.scope.as_str()));
        encode_form(&pairs)
    }

    fn check_reply(reply: HttpReply) -> Result<HttpReply, AuthError> {
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(AuthError::from_status(reply.status, &reply.body))
        }
    }

    /// Hand back whatever the server said, as JSON where possible.
    fn passthrough_body(body: &str) -> Value {
        if body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    }

    // =========================================================================
    // Local state
    // =========================================================================

    /// Drop the session and everything else in the storage scope.
    pub fn logout(&self) {
        self.store.clear();
        info!("Logged out");
    }

    /// Presence check only; expiry is discovered when a downstream call fails.
    pub fn is_authenticated(&self) -> bool {
        self.store.load().is_present()
    }

    pub fn session(&self) -> Session {
        self.store.load()
    }

    pub fn access_token(&self) -> Option<String> {
        self.store
            .load()
            .into_data()
            .map(|data| data.access_token().to_string())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store
            .load()
            .into_data()
            .and_then(|data| data.refresh_token().map(str::to_string))
    }

    /// `Authorization` header value for outbound authenticated requests.
    pub fn authorization_header(&self) -> Option<String> {
        self.access_token().map(|token| format!("Bearer {}", token))
    }
}
