//! Visual comparator client
//!
//! Pairwise image comparison used by the vision verifier. Unlike the
//! classifier, a failed or malformed comparator response is an error: an
//! unverified accept is worse than a retry, so the caller aborts the
//! resolution attempt instead of degrading.

use crate::models::MatchConfidence;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("lineup/", env!("CARGO_PKG_VERSION"));

/// Comparator client errors
#[derive(Debug, Error)]
pub enum ComparatorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result of one pairwise visual comparison
#[derive(Debug, Clone)]
pub struct VisualComparison {
    /// Visual similarity 0–100 (clamped by the caller)
    pub similarity: f64,
    pub confidence: MatchConfidence,
    /// Reason tag for a hard contradiction (nullable)
    pub fatal_mismatch: Option<String>,
    pub explanation: Option<String>,
}

/// Visual comparator capability
#[async_trait]
pub trait VisualComparator: Send + Sync {
    async fn compare(
        &self,
        image_a: &str,
        image_b: &str,
        context_a: Option<&str>,
        context_b: Option<&str>,
    ) -> Result<VisualComparison, ComparatorError>;
}

/// Wire response shape
#[derive(Debug, Deserialize)]
struct CompareResponse {
    similarity: f64,
    confidence: String,
    fatal_mismatch: Option<String>,
    explanation: Option<String>,
}

/// HTTP visual comparator client
pub struct ComparatorClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ComparatorClient {
    pub fn new(base_url: String, timeout_ms: u64) -> Result<Self, ComparatorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ComparatorError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }
}

#[async_trait]
impl VisualComparator for ComparatorClient {
    async fn compare(
        &self,
        image_a: &str,
        image_b: &str,
        context_a: Option<&str>,
        context_b: Option<&str>,
    ) -> Result<VisualComparison, ComparatorError> {
        tracing::debug!(image_a, image_b, "Requesting visual comparison");

        let response = self
            .http_client
            .post(format!("{}/compare", self.base_url))
            .json(&serde_json::json!({
                "image_a": image_a,
                "image_b": image_b,
                "context_a": context_a,
                "context_b": context_b,
            }))
            .send()
            .await
            .map_err(|e| ComparatorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ComparatorError::Api(status.as_u16(), error_text));
        }

        let body: CompareResponse = response
            .json()
            .await
            .map_err(|e| ComparatorError::Parse(e.to_string()))?;

        tracing::debug!(
            similarity = body.similarity,
            confidence = %body.confidence,
            fatal_mismatch = ?body.fatal_mismatch,
            "Visual comparison received"
        );

        Ok(VisualComparison {
            similarity: body.similarity,
            confidence: MatchConfidence::parse_lenient(&body.confidence),
            fatal_mismatch: body.fatal_mismatch,
            explanation: body.explanation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ComparatorClient::new("http://localhost:9303".to_string(), 30_000);
        assert!(client.is_ok());
    }

    #[test]
    fn test_response_parse() {
        let body: CompareResponse = serde_json::from_str(
            r#"{"similarity": 93.5, "confidence": "high", "fatal_mismatch": null, "explanation": "same person"}"#,
        )
        .unwrap();
        assert_eq!(body.similarity, 93.5);
        assert_eq!(MatchConfidence::parse_lenient(&body.confidence), MatchConfidence::High);
        assert!(body.fatal_mismatch.is_none());
    }

    #[test]
    fn test_response_with_fatal_mismatch() {
        let body: CompareResponse = serde_json::from_str(
            r#"{"similarity": 20.0, "confidence": "high", "fatal_mismatch": "different_build", "explanation": null}"#,
        )
        .unwrap();
        assert_eq!(body.fatal_mismatch.as_deref(), Some("different_build"));
    }

    #[test]
    fn test_response_missing_similarity_is_error() {
        let result: Result<CompareResponse, _> =
            serde_json::from_str(r#"{"confidence": "high", "fatal_mismatch": null}"#);
        assert!(result.is_err(), "malformed comparator output must not be silently accepted");
    }
}
