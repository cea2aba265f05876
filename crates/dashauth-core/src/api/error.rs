use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    #[error("No active session - log in first")]
    NoActiveSession,

    #[error("Failed to persist session: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// OAuth 2.0 error body (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Server-provided message: `error_description`, then `error`, then the raw body.
    fn server_message(body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<OAuthErrorBody>(body) {
            if let Some(message) = parsed
                .error_description
                .filter(|d| !d.is_empty())
                .or(parsed.error.filter(|e| !e.is_empty()))
            {
                return Self::truncate_body(&message);
            }
        }
        if body.trim().is_empty() {
            "no details provided".to_string()
        } else {
            Self::truncate_body(body)
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            400 | 401 | 403 => AuthError::AuthenticationRejected(Self::server_message(body)),
            _ => AuthError::TransportFailure(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::AuthenticationRejected(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "request timed out"
        } else if e.is_connect() {
            "endpoint unreachable"
        } else {
            "request failed"
        };
        AuthError::TransportFailure(format!("{}: {}", kind, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_error_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Bad credentials"}"#;
        match AuthError::from_status(400, body) {
            AuthError::AuthenticationRejected(msg) => assert_eq!(msg, "Bad credentials"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_status_falls_back_to_error_code() {
        let body = r#"{"error":"invalid_client"}"#;
        match AuthError::from_status(401, body) {
            AuthError::AuthenticationRejected(msg) => assert_eq!(msg, "invalid_client"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_status_plain_text_body() {
        match AuthError::from_status(403, "Forbidden") {
            AuthError::AuthenticationRejected(msg) => assert_eq!(msg, "Forbidden"),
            other => panic!("unexpected error: {:?}", other),
        }
        match AuthError::from_status(401, "") {
            AuthError::AuthenticationRejected(msg) => assert_eq!(msg, "no details provided"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_status_server_errors_are_transport_failures() {
        assert!(matches!(
            AuthError::from_status(503, "unavailable"),
            AuthError::TransportFailure(_)
        ));
        assert!(matches!(
            AuthError::from_status(404, "not found"),
            AuthError::TransportFailure(_)
        ));
        assert!(!AuthError::from_status(500, "").is_rejection());
        assert!(AuthError::from_status(401, "").is_rejection());
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 100);
        let truncated = AuthError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated, 600 total bytes"));

        // Never splits a multi-byte character
        let wide = "é".repeat(MAX_ERROR_BODY_LENGTH);
        let truncated = AuthError::truncate_body(&wide);
        assert!(truncated.contains("truncated"));
    }
}
