//! HTTP boundary for the authorization and registration endpoints.
//!
//! The session manager only ever issues two kinds of request: a form-encoded
//! POST to the token endpoint and a JSON POST to the registration endpoint.
//! `Transport` captures exactly that, so tests can substitute a recording fake.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::AuthError;

/// HTTP request timeout in seconds.
/// 30s allows for slow token endpoints while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST an already-encoded `application/x-www-form-urlencoded` body.
    async fn post_form(&self, url: &str, body: String) -> Result<HttpReply, AuthError>;

    /// POST a JSON body.
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpReply, AuthError>;
}

/// Transport backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }

    async fn finish(response: reqwest::Response) -> Result<HttpReply, AuthError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "Response received");
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_form(&self, url: &str, body: String) -> Result<HttpReply, AuthError> {
        debug!(url = url, "POST form");
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        Self::finish(response).await
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpReply, AuthError> {
        debug!(url = url, "POST json");
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        Self::finish(response).await
    }
}
