//! Candidate shortlister
//!
//! **[IRE-SHORT-010]** Scores a new description against all candidate
//! groups via the grouping classifier and ranks the results.
//!
//! Failure policy: one bad row never blocks the rest of the shortlist.
//! Out-of-range probabilities are clamped into [0, 100]; rows whose group
//! id is missing, unparsable, or not among the candidates count as "no
//! match" for that comparison; candidates absent from the response score 0.
//! A transport failure of the (batched) classifier call degrades every
//! candidate to 0 — resolution continues and falls through to creating a
//! new group rather than aborting.

use crate::db::groups::GroupCandidate;
use crate::models::ShortlistEntry;
use crate::services::classifier::{ClassificationSubject, GroupingClassifier, RawGroupScore};
use std::collections::HashMap;
use std::sync::Arc;

/// Candidate shortlister service
pub struct CandidateShortlister {
    classifier: Arc<dyn GroupingClassifier>,
}

impl CandidateShortlister {
    pub fn new(classifier: Arc<dyn GroupingClassifier>) -> Self {
        Self { classifier }
    }

    /// Score the subject against all candidates, ranked by probability
    /// descending
    ///
    /// Empty candidate list (first-ever capture) returns an empty shortlist,
    /// short-circuiting resolution to "create new group".
    pub async fn score(
        &self,
        subject: &ClassificationSubject,
        candidates: &[GroupCandidate],
    ) -> Vec<ShortlistEntry> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let rows = match self.classifier.score_groups(subject, candidates).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    candidates = candidates.len(),
                    "Classifier call failed; scoring all candidates 0"
                );
                Vec::new()
            }
        };

        Self::rank(candidates, rows)
    }

    /// Normalize raw rows against the candidate set and rank them
    fn rank(candidates: &[GroupCandidate], rows: Vec<RawGroupScore>) -> Vec<ShortlistEntry> {
        let candidate_ids: Vec<i64> = candidates.iter().map(|c| c.group_id).collect();

        let mut scored: HashMap<i64, ShortlistEntry> = HashMap::new();
        for row in rows {
            let Some(group_id) = row.group_id else {
                tracing::debug!("Dropping classifier row without usable group id");
                continue;
            };
            if !candidate_ids.contains(&group_id) {
                tracing::debug!(group_id, "Dropping classifier row for unknown group");
                continue;
            }

            let probability = row
                .probability
                .map(|p| p.clamp(0.0, 100.0).round() as i64)
                .unwrap_or(0);

            // Keep the highest score if the classifier repeats a group
            let entry = ShortlistEntry {
                group_id,
                probability,
                explanation: row.explanation.unwrap_or_default(),
            };
            match scored.get(&group_id) {
                Some(existing) if existing.probability >= probability => {}
                _ => {
                    scored.insert(group_id, entry);
                }
            }
        }

        // Candidates the classifier did not score count as 0
        let mut shortlist: Vec<ShortlistEntry> = candidate_ids
            .iter()
            .map(|&group_id| {
                scored.remove(&group_id).unwrap_or(ShortlistEntry {
                    group_id,
                    probability: 0,
                    explanation: String::new(),
                })
            })
            .collect();

        // Probability descending; group id ascending for a deterministic tie order
        shortlist.sort_by(|a, b| {
            b.probability
                .cmp(&a.probability)
                .then(a.group_id.cmp(&b.group_id))
        });

        shortlist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::ClassifierError;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeClassifier {
        result: Result<Vec<RawGroupScore>, ()>,
    }

    #[async_trait]
    impl GroupingClassifier for FakeClassifier {
        async fn score_groups(
            &self,
            _subject: &ClassificationSubject,
            _candidates: &[GroupCandidate],
        ) -> Result<Vec<RawGroupScore>, ClassifierError> {
            match &self.result {
                Ok(rows) => Ok(rows.clone()),
                Err(()) => Err(ClassifierError::Network("connection refused".to_string())),
            }
        }
    }

    fn candidate(group_id: i64) -> GroupCandidate {
        GroupCandidate {
            group_id,
            schema: Some(json!({"top": "jacket"})),
            natural_summary: None,
        }
    }

    fn subject() -> ClassificationSubject {
        ClassificationSubject {
            schema: Some(json!({"top": "red jacket"})),
            natural_summary: None,
        }
    }

    fn score(group_id: Option<i64>, probability: Option<f64>) -> RawGroupScore {
        RawGroupScore {
            group_id,
            probability,
            explanation: None,
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_short_circuits() {
        let shortlister = CandidateShortlister::new(Arc::new(FakeClassifier {
            result: Ok(vec![score(Some(1), Some(99.0))]),
        }));

        let shortlist = shortlister.score(&subject(), &[]).await;
        assert!(shortlist.is_empty());
    }

    #[tokio::test]
    async fn test_ranked_descending() {
        let shortlister = CandidateShortlister::new(Arc::new(FakeClassifier {
            result: Ok(vec![
                score(Some(1), Some(40.0)),
                score(Some(2), Some(92.0)),
                score(Some(3), Some(75.0)),
            ]),
        }));

        let shortlist = shortlister
            .score(&subject(), &[candidate(1), candidate(2), candidate(3)])
            .await;

        let order: Vec<i64> = shortlist.iter().map(|e| e.group_id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_out_of_range_probabilities_clamped() {
        let shortlister = CandidateShortlister::new(Arc::new(FakeClassifier {
            result: Ok(vec![
                score(Some(1), Some(140.0)),
                score(Some(2), Some(-12.0)),
            ]),
        }));

        let shortlist = shortlister.score(&subject(), &[candidate(1), candidate(2)]).await;
        assert_eq!(shortlist[0].group_id, 1);
        assert_eq!(shortlist[0].probability, 100);
        assert_eq!(shortlist[1].probability, 0);
    }

    #[tokio::test]
    async fn test_unknown_and_missing_ids_dropped() {
        let shortlister = CandidateShortlister::new(Arc::new(FakeClassifier {
            result: Ok(vec![
                score(Some(99), Some(95.0)), // not a candidate
                score(None, Some(90.0)),     // unusable id
                score(Some(1), Some(60.0)),
            ]),
        }));

        let shortlist = shortlister.score(&subject(), &[candidate(1)]).await;
        assert_eq!(shortlist.len(), 1);
        assert_eq!(shortlist[0].group_id, 1);
        assert_eq!(shortlist[0].probability, 60);
    }

    #[tokio::test]
    async fn test_unscored_candidates_get_zero() {
        let shortlister = CandidateShortlister::new(Arc::new(FakeClassifier {
            result: Ok(vec![score(Some(2), Some(80.0))]),
        }));

        let shortlist = shortlister.score(&subject(), &[candidate(1), candidate(2)]).await;
        assert_eq!(shortlist.len(), 2);
        assert_eq!(shortlist[0].group_id, 2);
        assert_eq!(shortlist[1].group_id, 1);
        assert_eq!(shortlist[1].probability, 0);
    }

    #[tokio::test]
    async fn test_classifier_failure_degrades_to_zero() {
        let shortlister = CandidateShortlister::new(Arc::new(FakeClassifier { result: Err(()) }));

        let shortlist = shortlister.score(&subject(), &[candidate(1), candidate(2)]).await;
        assert_eq!(shortlist.len(), 2);
        assert!(shortlist.iter().all(|e| e.probability == 0));
    }

    #[tokio::test]
    async fn test_duplicate_rows_keep_highest() {
        let shortlister = CandidateShortlister::new(Arc::new(FakeClassifier {
            result: Ok(vec![score(Some(1), Some(30.0)), score(Some(1), Some(85.0))]),
        }));

        let shortlist = shortlister.score(&subject(), &[candidate(1)]).await;
        assert_eq!(shortlist[0].probability, 85);
    }
}
