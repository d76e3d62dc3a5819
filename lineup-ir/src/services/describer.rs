//! Describer service client
//!
//! Produces the structured appearance profile for a capture's image. How
//! the description is produced is outside this subsystem; a null result
//! means "cannot describe" and leaves the capture ungrouped.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("lineup/", env!("CARGO_PKG_VERSION"));

/// Describer client errors
#[derive(Debug, Error)]
pub enum DescriberError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// A structured description of a capture
#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    /// Structured attribute object (opaque to this subsystem)
    pub schema: serde_json::Value,
    /// Short textual summary derived from the schema
    pub natural_summary: Option<String>,
}

/// Describer capability
///
/// `Ok(None)` is a valid answer: the service could not produce a
/// description (e.g. no person visible). Errors are transport/API
/// failures and abort the resolution attempt.
#[async_trait]
pub trait Describer: Send + Sync {
    async fn describe(&self, image_ref: &str) -> Result<Option<Description>, DescriberError>;
}

/// Wire response: `description` is null when the service cannot describe
#[derive(Debug, Deserialize)]
struct DescribeResponse {
    description: Option<Description>,
}

/// HTTP describer client
pub struct DescriberClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DescriberClient {
    pub fn new(base_url: String, api_key: String, timeout_ms: u64) -> Result<Self, DescriberError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| DescriberError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl Describer for DescriberClient {
    async fn describe(&self, image_ref: &str) -> Result<Option<Description>, DescriberError> {
        tracing::debug!(image_ref, "Requesting description");

        let response = self
            .http_client
            .post(format!("{}/describe", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "image_ref": image_ref }))
            .send()
            .await
            .map_err(|e| DescriberError::Network(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(DescriberError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DescriberError::Api(status.as_u16(), error_text));
        }

        let body: DescribeResponse = response
            .json()
            .await
            .map_err(|e| DescriberError::Parse(e.to_string()))?;

        if body.description.is_none() {
            tracing::info!(image_ref, "Describer returned no description");
        }

        Ok(body.description)
    }
}
