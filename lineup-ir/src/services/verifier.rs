//! Vision verifier
//!
//! **[IRE-VIS-010]** Image-grounded second opinion for the strongest
//! shortlist candidates. The textual score can be misled by paraphrase
//! differences between two accurate descriptions of different people; the
//! verifier compares the actual images, most-likely-first, and stops at
//! the first candidate that passes every acceptance criterion.
//!
//! Failure policy is the opposite of the shortlister's: a comparator
//! transport error aborts the whole verification pass and propagates,
//! because an unverified accept is worse than a retry. A candidate with no
//! representative image is recorded as skipped and never auto-accepted,
//! but does not block evaluation of the remaining candidates.

use crate::db::groups::GroupRepresentative;
use crate::models::{
    MatchConfidence, ShortlistEntry, VerifierComparison, VerifierDecision, VerifierOutcome,
};
use crate::services::comparator::{ComparatorError, VisualComparator};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Verification errors — always fatal to the resolution attempt
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("Comparator error: {0}")]
    Comparator(#[from] ComparatorError),
}

/// Vision verifier service
pub struct VisionVerifier {
    comparator: Arc<dyn VisualComparator>,
    /// How many top candidates to examine
    shortlist_size: usize,
    /// Minimum similarity for an accept
    accept_similarity: i64,
    /// Whether only "high" confidence is acceptable
    require_high_confidence: bool,
}

impl VisionVerifier {
    pub fn new(
        comparator: Arc<dyn VisualComparator>,
        shortlist_size: usize,
        accept_similarity: i64,
        require_high_confidence: bool,
    ) -> Self {
        Self {
            comparator,
            shortlist_size,
            accept_similarity,
            require_high_confidence,
        }
    }

    /// Verify the top shortlisted candidates against the new capture's image
    ///
    /// `shortlist` must already be ranked descending; `representatives`
    /// maps group id to the group's canonical image payload.
    pub async fn verify(
        &self,
        new_image_ref: &str,
        new_context: Option<&str>,
        shortlist: &[ShortlistEntry],
        representatives: &HashMap<i64, GroupRepresentative>,
    ) -> Result<VerifierDecision, VerifierError> {
        let mut comparisons = Vec::new();

        for entry in shortlist.iter().take(self.shortlist_size) {
            let Some(representative) = representatives.get(&entry.group_id) else {
                tracing::warn!(
                    group_id = entry.group_id,
                    "No representative payload for candidate; skipping"
                );
                comparisons.push(Self::skipped(entry.group_id, "missing_reference_payload"));
                continue;
            };

            if representative.image_ref.is_empty() {
                tracing::warn!(
                    group_id = entry.group_id,
                    "Representative has no image reference; skipping"
                );
                comparisons.push(Self::skipped(entry.group_id, "missing_reference_image"));
                continue;
            }

            // Comparator errors propagate: abort the whole pass
            let comparison = self
                .comparator
                .compare(
                    new_image_ref,
                    &representative.image_ref,
                    new_context,
                    representative.natural_summary.as_deref(),
                )
                .await?;

            let similarity = comparison.similarity.clamp(0.0, 100.0).round() as i64;
            let confidence_ok =
                !self.require_high_confidence || comparison.confidence == MatchConfidence::High;
            let accepted = similarity >= self.accept_similarity
                && confidence_ok
                && comparison.fatal_mismatch.is_none();

            tracing::info!(
                group_id = entry.group_id,
                probability = entry.probability,
                similarity,
                confidence = comparison.confidence.as_str(),
                fatal_mismatch = ?comparison.fatal_mismatch,
                accepted,
                "Visual verification comparison"
            );

            comparisons.push(VerifierComparison {
                group_id: entry.group_id,
                outcome: if accepted {
                    VerifierOutcome::Accepted
                } else {
                    VerifierOutcome::Rejected
                },
                similarity: Some(similarity),
                confidence: Some(comparison.confidence),
                fatal_mismatch: comparison.fatal_mismatch,
                skip_reason: None,
                explanation: comparison.explanation,
            });

            if accepted {
                return Ok(VerifierDecision {
                    approved_group_id: Some(entry.group_id),
                    comparisons,
                });
            }
        }

        Ok(VerifierDecision {
            approved_group_id: None,
            comparisons,
        })
    }

    fn skipped(group_id: i64, reason: &str) -> VerifierComparison {
        VerifierComparison {
            group_id,
            outcome: VerifierOutcome::Skipped,
            similarity: None,
            confidence: None,
            fatal_mismatch: None,
            skip_reason: Some(reason.to_string()),
            explanation: None,
        }
    }
}
