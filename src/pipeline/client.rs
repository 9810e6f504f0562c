//! OCR client: send one [`OcrRequest`] to the remote model.
//!
//! The only stage with network I/O. It never returns `Err` to mean "abort":
//! every failure, from DNS errors to a 503, is captured as a
//! [`RemoteApiError`] value so the aggregator can record it against the page
//! and move on to the next one. There are no retries; a failed page is
//! reported, not re-sent.

use super::request::OcrRequest;
use crate::config::{ApiConfig, REQUEST_TIMEOUT};
use crate::error::{OcrError, RemoteApiError};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// The outcome of one remote call: the raw response JSON, or a captured error.
pub type ApiResult = Result<Value, RemoteApiError>;

/// Anything that can answer an [`OcrRequest`].
///
/// [`HttpOcrClient`] is the production implementation; tests substitute
/// scripted fakes.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn send(&self, request: &OcrRequest) -> ApiResult;
}

/// Bearer-authenticated HTTP client for a chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpOcrClient {
    config: ApiConfig,
    http: reqwest::Client,
}

impl HttpOcrClient {
    /// Build a client. Fails if the endpoint or key is missing.
    pub fn new(config: ApiConfig) -> Result<Self, OcrError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OcrError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

#[async_trait]
impl OcrBackend for HttpOcrClient {
    async fn send(&self, request: &OcrRequest) -> ApiResult {
        let start = Instant::now();
        let url = &self.config.endpoint;

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&request.payload())
            .send()
            .await
            .map_err(|e| {
                let err = RemoteApiError::new(e.to_string(), e.status().map(|s| s.as_u16()));
                warn!("OCR request failed: {}", err);
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Error");
            let kind = if status.is_client_error() {
                "Client Error"
            } else {
                "Server Error"
            };
            let err = RemoteApiError::new(
                format!("{} {}: {} for url: {}", status.as_u16(), kind, reason, url),
                Some(status.as_u16()),
            );
            warn!("OCR request rejected: {}", err);
            return Err(err);
        }

        // An undecodable body carries no status: there is no error response.
        let body: Value = response.json().await.map_err(|e| {
            let err = RemoteApiError::network(format!("Invalid JSON in response: {}", e));
            warn!("{}", err);
            err
        })?;

        debug!(
            "OCR response {} in {}ms",
            status.as_u16(),
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}
