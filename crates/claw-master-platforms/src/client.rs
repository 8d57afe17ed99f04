//! JSON request helper shared by the platform clients.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// Where a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The platform answered with an error status or `success: false`.
    Http,
    /// The request never got a response.
    Network,
    /// The response body could not be decoded.
    Decode,
}

/// Error returned by a platform request.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
    /// Human-readable hint supplied by the platform.
    pub hint: Option<String>,
}

impl ApiError {
    fn network(err: &reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            status: None,
            message: format!("request failed: {err}"),
            hint: None,
        }
    }

    fn decode(status: StatusCode, detail: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            status: Some(status.as_u16()),
            message: format!("unexpected response body: {detail}"),
            hint: None,
        }
    }

    fn from_body(status: StatusCode, body: &Value) -> Self {
        let parsed = ErrorBody::deserialize(body).unwrap_or_default();
        let message = parsed
            .error
            .or(parsed.message)
            .unwrap_or_else(|| status_message(status));
        Self {
            kind: ApiErrorKind::Http,
            status: Some(status.as_u16()),
            message,
            hint: parsed.hint,
        }
    }

    fn from_status(status: StatusCode) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            status: Some(status.as_u16()),
            message: status_message(status),
            hint: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
    hint: Option<String>,
}

fn status_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}

/// Payload optionally wrapped in an `agent` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AgentEnvelope<T> {
    Wrapped { agent: T },
    Bare(T),
}

impl<T> AgentEnvelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { agent } | Self::Bare(agent) => agent,
        }
    }
}

/// JSON client for one platform's REST API.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlatformClient {
    /// Create a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(&e))?;
        Ok(Self::with_http(http, base_url))
    }

    /// Create a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET` a JSON document.
    ///
    /// # Errors
    /// Returns error on network failure, error status, or undecodable body.
    pub async fn get_json<T>(&self, path: &str, token: Option<&str>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        Self::send(self.http.get(self.url(path)), token).await
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    /// Returns error on network failure, error status, or undecodable body.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Self::send(self.http.post(self.url(path)).json(body), token).await
    }

    async fn send<T>(request: RequestBuilder, token: Option<&str>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| ApiError::network(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::network(&e))?;

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => return Err(ApiError::from_status(status)),
            Err(e) => return Err(ApiError::decode(status, e)),
        };

        if !status.is_success() || value.get("success") == Some(&Value::Bool(false)) {
            let err = ApiError::from_body(status, &value);
            tracing::debug!(status = status.as_u16(), message = %err.message, "platform request failed");
            return Err(err);
        }

        serde_json::from_value(value).map_err(|e| ApiError::decode(status, e))
    }
}
