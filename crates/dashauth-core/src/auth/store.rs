use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::api::AuthError;
use crate::storage::Storage;

/// Storage key holding the serialized session
const SESSION_KEY: &str = "session";

const ACCESS_TOKEN_FIELD: &str = "access_token";
const REFRESH_TOKEN_FIELD: &str = "refresh_token";

/// Token response as returned by the authorization endpoint.
///
/// The full JSON object is kept verbatim so fields this crate does not
/// interpret (`expires_in`, `scope`, `id_token`, ...) round-trip unchanged.
/// Construction guarantees a string `access_token`.
#[derive(Clone, PartialEq)]
pub struct SessionData {
    raw: Map<String, Value>,
}

impl SessionData {
    /// Accepts any JSON object carrying a string `access_token`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(raw) if raw.get(ACCESS_TOKEN_FIELD).is_some_and(Value::is_string) => {
                Some(Self { raw })
            }
            _ => None,
        }
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok().and_then(Self::from_value)
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.raw.get(field).and_then(Value::as_str)
    }

    pub fn access_token(&self) -> &str {
        self.str_field(ACCESS_TOKEN_FIELD).unwrap_or_default()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.str_field(REFRESH_TOKEN_FIELD)
    }

    /// Server token type hint, passed through uninterpreted.
    pub fn token_type(&self) -> Option<&str> {
        self.str_field("token_type")
    }

    /// Server expiry hint in seconds, passed through uninterpreted.
    pub fn expires_in(&self) -> Option<i64> {
        self.raw.get("expires_in").and_then(Value::as_i64)
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.raw.clone()).to_string()
    }
}

impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token().map(|_| "[redacted]"),
            )
            .field("token_type", &self.token_type())
            .field("expires_in", &self.expires_in())
            .finish()
    }
}

/// What the credential store holds: a whole session or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Present(SessionData),
    Absent,
}

impl Session {
    pub fn is_present(&self) -> bool {
        matches!(self, Session::Present(_))
    }

    pub fn into_data(self) -> Option<SessionData> {
        match self {
            Session::Present(data) => Some(data),
            Session::Absent => None,
        }
    }
}

/// Single-slot session persistence over a storage scope.
///
/// Tokens are written in clear text; inject `MemoryStorage` where that is
/// not acceptable.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Replace the stored session.
    pub fn save(&self, data: &SessionData) -> Result<(), AuthError> {
        self.storage
            .set_item(SESSION_KEY, &data.to_json())
            .map_err(|e| AuthError::Storage(format!("{:#}", e)))?;
        debug!(has_refresh_token = data.refresh_token().is_some(), "Session saved");
        Ok(())
    }

    /// Load the stored session. Malformed records are `Absent`.
    pub fn load(&self) -> Session {
        let Some(contents) = self.storage.get_item(SESSION_KEY) else {
            return Session::Absent;
        };
        match SessionData::from_json(&contents) {
            Some(data) => Session::Present(data),
            None => {
                warn!("Ignoring malformed stored session");
                Session::Absent
            }
        }
    }

    /// Remove the session and every other key in the storage scope.
    pub fn clear(&self) {
        self.storage.clear();
        debug!("Credential store cleared");
    }
}
