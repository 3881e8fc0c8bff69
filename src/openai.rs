//! Minimal client for OpenAI-compatible REST endpoints
//!
//! Shared by the embedding and chat-completion clients: base URL handling,
//! bearer authentication, and translation of provider error bodies.

use crate::config::Config;
use crate::error::Result;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

/// A failed provider call
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// HTTP status, if a response was received
    pub status: Option<StatusCode>,
    pub message: String,
}

impl ProviderError {
    /// Transport failures, rate limits and server errors are worth retrying
    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(status) => status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// OpenAI-compatible HTTP client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends with '/'
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Build a client from the `[openai]` config section
    pub fn from_config(config: &Config, api_key: impl Into<String>) -> Result<Self> {
        Self::new(
            &config.openai.base_url,
            api_key,
            Duration::from_secs(config.openai.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Start an authenticated POST to `path` (relative to the base URL)
    pub fn post(&self, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        Ok(self.client.post(url).bearer_auth(&self.api_key))
    }

    /// Send a request and decode a JSON body, mapping failures to [`ProviderError`]
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, ProviderError> {
        let response = request.send().await.map_err(|e| ProviderError {
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| {
                    if body.trim().is_empty() {
                        status
                            .canonical_reason()
                            .unwrap_or("request failed")
                            .to_string()
                    } else {
                        body
                    }
                });
            return Err(ProviderError {
                status: Some(status),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| ProviderError {
            status: Some(status),
            message: format!("invalid response body: {}", e),
        })
    }
}
