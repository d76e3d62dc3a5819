//! Resolution state machine types and outcome evidence
//!
//! **[IRE-RES-010]** Resolution progresses through defined states:
//! UNRESOLVED → EVALUATING → {MATCHED_EXISTING | CREATED_NEW} → COMMITTED
//! with ABORTED as the terminal state for unrecoverable external failures.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// **[IRE-RES-010]** Resolution workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionState {
    /// Capture has no usable description yet, or resolution not started
    Unresolved,
    /// Shortlisting and verification in progress
    Evaluating,
    /// An existing group was accepted
    MatchedExisting,
    /// No existing group accepted; a new group will be allocated
    CreatedNew,
    /// Outcome durably committed
    Committed,
    /// Unrecoverable external failure; no state was mutated
    Aborted,
}

impl ResolutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Unresolved => "UNRESOLVED",
            ResolutionState::Evaluating => "EVALUATING",
            ResolutionState::MatchedExisting => "MATCHED_EXISTING",
            ResolutionState::CreatedNew => "CREATED_NEW",
            ResolutionState::Committed => "COMMITTED",
            ResolutionState::Aborted => "ABORTED",
        }
    }
}

/// Confidence tier reported by the visual comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
}

impl MatchConfidence {
    /// Lenient parse: anything unrecognized is treated as low confidence
    /// rather than failing the comparison.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => MatchConfidence::High,
            "medium" => MatchConfidence::Medium,
            _ => MatchConfidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchConfidence::High => "high",
            MatchConfidence::Medium => "medium",
            MatchConfidence::Low => "low",
        }
    }
}

/// One ranked shortlist candidate (classifier evidence)
///
/// Ephemeral — produced fresh for every resolution attempt, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub group_id: i64,
    /// Textual match probability, clamped to [0, 100]
    pub probability: i64,
    pub explanation: String,
}

/// Outcome of a single pairwise visual comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierOutcome {
    /// Met all acceptance criteria; verification stopped here
    Accepted,
    /// Comparison completed but failed at least one criterion
    Rejected,
    /// Comparison not attempted (see `skip_reason`)
    Skipped,
}

/// One verifier comparison record (comparator evidence)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierComparison {
    pub group_id: i64,
    pub outcome: VerifierOutcome,
    /// Visual similarity [0, 100]; absent when skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<MatchConfidence>,
    /// Reason tag for a hard visual contradiction (e.g. different build)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_mismatch: Option<String>,
    /// `missing_reference_image` / `missing_reference_payload` when skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Result of a verification pass over the shortlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierDecision {
    /// First group that met all acceptance criteria, if any
    pub approved_group_id: Option<i64>,
    /// All comparisons performed, in evaluation order
    pub comparisons: Vec<VerifierComparison>,
}

impl VerifierDecision {
    /// Whether the verifier recorded a fatal visual mismatch for the group
    ///
    /// A fatal mismatch vetoes a textual-threshold accept regardless of how
    /// high the classifier probability was.
    pub fn has_fatal_mismatch_for(&self, group_id: i64) -> bool {
        self.comparisons
            .iter()
            .any(|c| c.group_id == group_id && c.fatal_mismatch.is_some())
    }
}

/// Final result of one resolution attempt
///
/// The caller always receives exactly one of: matched (existing group),
/// created (new group), or an error mapping to ABORTED — never a silent
/// no-op other than the explicit idempotent re-resolution case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Attempt identifier for log correlation
    pub attempt_id: Uuid,
    pub capture_id: i64,
    pub state: ResolutionState,
    pub matched: bool,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_display_code: Option<String>,
    /// Classifier evidence (empty when resolution short-circuited)
    pub shortlist: Vec<ShortlistEntry>,
    /// Comparator evidence, when verification ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerifierDecision>,
}
