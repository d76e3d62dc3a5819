//! Grouping classifier client
//!
//! Scores a new capture's description against candidate group descriptions
//! in a single batched request, so the classifier can rank candidates
//! relative to each other. The raw wire rows are returned as-is; the
//! shortlister applies clamping and drops rows with unusable group ids.

use crate::db::groups::GroupCandidate;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("lineup/", env!("CARGO_PKG_VERSION"));

/// Classifier client errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// The new capture's comparison payload
#[derive(Debug, Clone)]
pub struct ClassificationSubject {
    pub schema: Option<serde_json::Value>,
    pub natural_summary: Option<String>,
}

/// One raw score row from the classifier
///
/// Fields are optional because the wire payload is untrusted: a row with a
/// missing or unparsable group id is "no match" for that comparison, and
/// an out-of-range probability is clamped — neither fails the resolution.
#[derive(Debug, Clone)]
pub struct RawGroupScore {
    pub group_id: Option<i64>,
    pub probability: Option<f64>,
    pub explanation: Option<String>,
}

/// Grouping classifier capability
#[async_trait]
pub trait GroupingClassifier: Send + Sync {
    async fn score_groups(
        &self,
        subject: &ClassificationSubject,
        candidates: &[GroupCandidate],
    ) -> Result<Vec<RawGroupScore>, ClassifierError>;
}

/// HTTP grouping classifier client
pub struct ClassifierClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ClassifierClient {
    pub fn new(base_url: String, timeout_ms: u64) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Extract a raw score row from one wire JSON object
    ///
    /// Group ids are accepted as JSON numbers or numeric strings; anything
    /// else becomes `None`. Probabilities must be JSON numbers.
    fn normalize_row(row: &serde_json::Value) -> RawGroupScore {
        let group_id = match row.get("group_id") {
            Some(serde_json::Value::Number(n)) => n.as_i64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        let probability = row.get("probability").and_then(|v| v.as_f64());

        let explanation = row
            .get("explanation")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        RawGroupScore {
            group_id,
            probability,
            explanation,
        }
    }
}

#[async_trait]
impl GroupingClassifier for ClassifierClient {
    async fn score_groups(
        &self,
        subject: &ClassificationSubject,
        candidates: &[GroupCandidate],
    ) -> Result<Vec<RawGroupScore>, ClassifierError> {
        let candidate_payload: Vec<serde_json::Value> = candidates
            .iter()
            .map(|c| {
                serde_json::json!({
                    "group_id": c.group_id,
                    "schema": c.schema,
                    "natural_summary": c.natural_summary,
                })
            })
            .collect();

        tracing::debug!(candidates = candidates.len(), "Querying grouping classifier");

        let response = self
            .http_client
            .post(format!("{}/score-groups", self.base_url))
            .json(&serde_json::json!({
                "subject": {
                    "schema": subject.schema,
                    "natural_summary": subject.natural_summary,
                },
                "candidates": candidate_payload,
            }))
            .send()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), error_text));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        let rows = body
            .get("comparisons")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ClassifierError::Parse("response missing 'comparisons' array".to_string())
            })?;

        Ok(rows.iter().map(Self::normalize_row).collect())
    }
}
