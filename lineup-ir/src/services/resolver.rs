//! Resolution orchestrator
//!
//! **[IRE-RES-010]** Drives one capture through the resolution state
//! machine: UNRESOLVED → EVALUATING → {MATCHED_EXISTING | CREATED_NEW} →
//! COMMITTED, with ABORTED on unrecoverable external failure.
//!
//! Decision cascade during EVALUATING:
//! 1. Empty candidate registry — create a new group immediately.
//! 2. Vision verifier approves a shortlisted group — match it.
//! 3. Best shortlist probability meets the accept threshold and the
//!    verifier recorded no fatal visual mismatch for that group — match it.
//! 4. Otherwise — create a new group.
//!
//! All outcome writes happen in a single transaction. Group ids are
//! allocated on the pool before the transaction opens, so a rollback can
//! leave a gap in the sequence but never a collision.

use crate::db::{allocator, captures, groups, settings::ResolutionOptions};
use crate::db::groups::GroupRepresentative;
use crate::models::{ResolutionOutcome, ResolutionState, ShortlistEntry, VerifierDecision};
use crate::services::classifier::{ClassificationSubject, GroupingClassifier};
use crate::services::comparator::VisualComparator;
use crate::services::describer::{Describer, DescriberError};
use crate::services::shortlister::CandidateShortlister;
use crate::services::verifier::{VerifierError, VisionVerifier};
use lineup_common::group_code;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Resolution errors — all map to ABORTED with no state mutated
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Capture {0} not found")]
    CaptureNotFound(i64),

    #[error("Capture {0} has no usable description")]
    NoUsableDescription(i64),

    #[error("Capture {0} is the representative of group {1} and cannot be re-evaluated")]
    RepresentativeReevaluation(i64, i64),

    #[error("Describer error: {0}")]
    Describer(#[from] DescriberError),

    #[error("Verification error: {0}")]
    Verifier(#[from] VerifierError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Settings(#[from] lineup_common::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Resolution orchestrator service
///
/// Holds the store pool and the three external capability traits; options
/// are re-read from the settings table on every attempt so threshold
/// changes take effect without a restart.
pub struct ResolutionOrchestrator {
    db: SqlitePool,
    describer: Arc<dyn Describer>,
    classifier: Arc<dyn GroupingClassifier>,
    comparator: Arc<dyn VisualComparator>,
}

impl ResolutionOrchestrator {
    pub fn new(
        db: SqlitePool,
        describer: Arc<dyn Describer>,
        classifier: Arc<dyn GroupingClassifier>,
        comparator: Arc<dyn VisualComparator>,
    ) -> Self {
        Self {
            db,
            describer,
            classifier,
            comparator,
        }
    }

    /// Resolve one capture to a person-group
    ///
    /// Idempotent without `force`: an already-grouped capture returns its
    /// existing assignment untouched. With `force`, evaluation re-runs and
    /// the capture may move to a different group (representatives are
    /// refused — the registry's canonical payloads must stay stable).
    pub async fn resolve(
        &self,
        capture_id: i64,
        force: bool,
    ) -> Result<ResolutionOutcome, ResolveError> {
        let attempt_id = Uuid::new_v4();

        tracing::info!(%attempt_id, capture_id, force, "Starting resolution");

        let options = ResolutionOptions::load(&self.db).await?;

        let mut capture = captures::load_capture(&self.db, capture_id)
            .await?
            .ok_or(ResolveError::CaptureNotFound(capture_id))?;

        // Idempotent short-circuit
        if let Some(group_id) = capture.group_id {
            if !force {
                tracing::info!(%attempt_id, capture_id, group_id, "Already resolved; no-op");
                return Ok(Self::outcome_matched(
                    attempt_id,
                    capture_id,
                    group_id,
                    Vec::new(),
                    None,
                ));
            }
            self.refuse_representative_reevaluation(capture_id, group_id)
                .await?;
        }

        // A usable description is the entry condition for EVALUATING; retry
        // the describer here if ingest could not produce one
        if !capture.has_usable_description() {
            match self.describer.describe(&capture.image_ref).await? {
                Some(description) => {
                    captures::update_description(
                        &self.db,
                        capture_id,
                        &description.schema,
                        description.natural_summary.as_deref(),
                    )
                    .await?;
                    capture.description_schema = Some(description.schema);
                    capture.natural_summary = description.natural_summary;
                }
                None => {
                    tracing::info!(%attempt_id, capture_id, "Describer produced no description");
                    return Err(ResolveError::NoUsableDescription(capture_id));
                }
            }
        }

        tracing::debug!(%attempt_id, capture_id, state = ResolutionState::Evaluating.as_str(), "Evaluating");

        let candidates = groups::load_candidates(&self.db).await?;

        let subject = ClassificationSubject {
            schema: capture.description_schema.clone(),
            natural_summary: capture.natural_summary.clone(),
        };
        let shortlister = CandidateShortlister::new(self.classifier.clone());
        let shortlist = shortlister.score(&subject, &candidates).await;

        if shortlist.is_empty() {
            tracing::info!(%attempt_id, capture_id, "No candidate groups; creating new group");
            return self
                .commit_new_group(attempt_id, &capture, shortlist, None)
                .await;
        }

        let verifier = VisionVerifier::new(
            self.comparator.clone(),
            options.vision_shortlist_size,
            options.vision_accept_similarity,
            options.require_high_confidence,
        );
        let representatives = self
            .load_representative_map(&shortlist, options.vision_shortlist_size)
            .await?;
        let decision = verifier
            .verify(
                &capture.image_ref,
                capture.natural_summary.as_deref(),
                &shortlist,
                &representatives,
            )
            .await?;

        let top = &shortlist[0];
        let chosen = if let Some(approved) = decision.approved_group_id {
            Some(approved)
        } else if top.probability >= options.match_accept_threshold
            && !decision.has_fatal_mismatch_for(top.group_id)
        {
            // Threshold accept, subject to the verifier's veto
            Some(top.group_id)
        } else {
            None
        };

        match chosen {
            Some(group_id) => {
                tracing::info!(
                    %attempt_id,
                    capture_id,
                    group_id,
                    top_probability = top.probability,
                    verifier_approved = decision.approved_group_id.is_some(),
                    "Matched existing group"
                );
                self.commit_match(attempt_id, &capture, group_id, shortlist, Some(decision))
                    .await
            }
            None => {
                tracing::info!(
                    %attempt_id,
                    capture_id,
                    top_probability = top.probability,
                    threshold = options.match_accept_threshold,
                    "No acceptable candidate; creating new group"
                );
                self.commit_new_group(attempt_id, &capture, shortlist, Some(decision))
                    .await
            }
        }
    }

    /// Representative payloads for the candidates the verifier will see
    async fn load_representative_map(
        &self,
        shortlist: &[ShortlistEntry],
        limit: usize,
    ) -> Result<HashMap<i64, GroupRepresentative>, ResolveError> {
        let ids: Vec<i64> = shortlist.iter().take(limit).map(|e| e.group_id).collect();
        let representatives = groups::load_representatives(&self.db, &ids).await?;
        Ok(representatives
            .into_iter()
            .map(|r| (r.group_id, r))
            .collect())
    }

    async fn refuse_representative_reevaluation(
        &self,
        capture_id: i64,
        group_id: i64,
    ) -> Result<(), ResolveError> {
        let group = groups::load_group(&self.db, group_id)
            .await?
            .ok_or(ResolveError::CaptureNotFound(capture_id))?;
        if group.representative_capture_id == capture_id {
            return Err(ResolveError::RepresentativeReevaluation(
                capture_id, group_id,
            ));
        }
        Ok(())
    }

    /// Commit a match to an existing group in one transaction
    ///
    /// The capture assignment is a conditional update: if another attempt
    /// already grouped this capture, this attempt rolls back and returns
    /// the winner's assignment instead of double-incrementing counts.
    async fn commit_match(
        &self,
        attempt_id: Uuid,
        capture: &crate::models::Capture,
        group_id: i64,
        shortlist: Vec<ShortlistEntry>,
        verification: Option<VerifierDecision>,
    ) -> Result<ResolutionOutcome, ResolveError> {
        let previous_group = capture.group_id;

        if previous_group == Some(group_id) {
            // Forced re-evaluation confirmed the existing assignment
            return Ok(Self::outcome_matched(
                attempt_id,
                capture.id,
                group_id,
                shortlist,
                verification,
            ));
        }

        let mut tx = self.db.begin().await?;

        let updated = match previous_group {
            Some(old_group) => {
                sqlx::query("UPDATE captures SET group_id = ? WHERE id = ? AND group_id = ?")
                    .bind(group_id)
                    .bind(capture.id)
                    .bind(old_group)
                    .execute(&mut *tx)
                    .await?
            }
            None => {
                sqlx::query("UPDATE captures SET group_id = ? WHERE id = ? AND group_id IS NULL")
                    .bind(group_id)
                    .bind(capture.id)
                    .execute(&mut *tx)
                    .await?
            }
        };

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return self
                .lost_assignment_race(attempt_id, capture.id, shortlist, verification)
                .await;
        }

        sqlx::query(
            r#"
            UPDATE person_groups
            SET member_count = member_count + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(group_id)
        .execute(&mut *tx)
        .await?;

        if let Some(old_group) = previous_group {
            sqlx::query(
                r#"
                UPDATE person_groups
                SET member_count = member_count - 1, updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(old_group)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(%attempt_id, capture_id = capture.id, group_id, "Committed match");

        Ok(Self::outcome_matched(
            attempt_id,
            capture.id,
            group_id,
            shortlist,
            verification,
        ))
    }

    /// Allocate a new group and commit the capture into it
    async fn commit_new_group(
        &self,
        attempt_id: Uuid,
        capture: &crate::models::Capture,
        shortlist: Vec<ShortlistEntry>,
        verification: Option<VerifierDecision>,
    ) -> Result<ResolutionOutcome, ResolveError> {
        // Allocated on the pool, outside the transaction below: a rollback
        // leaves a sequence gap, never a reused id
        let group_id = allocator::allocate_group_id(&self.db).await?;
        let previous_group = capture.group_id;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO person_groups (id, representative_capture_id, member_count)
            VALUES (?, ?, 1)
            "#,
        )
        .bind(group_id)
        .bind(capture.id)
        .execute(&mut *tx)
        .await?;

        let updated = match previous_group {
            Some(old_group) => {
                sqlx::query("UPDATE captures SET group_id = ? WHERE id = ? AND group_id = ?")
                    .bind(group_id)
                    .bind(capture.id)
                    .bind(old_group)
                    .execute(&mut *tx)
                    .await?
            }
            None => {
                sqlx::query("UPDATE captures SET group_id = ? WHERE id = ? AND group_id IS NULL")
                    .bind(group_id)
                    .bind(capture.id)
                    .execute(&mut *tx)
                    .await?
            }
        };

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return self
                .lost_assignment_race(attempt_id, capture.id, shortlist, verification)
                .await;
        }

        if let Some(old_group) = previous_group {
            sqlx::query(
                r#"
                UPDATE person_groups
                SET member_count = member_count - 1, updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(old_group)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            %attempt_id,
            capture_id = capture.id,
            group_id,
            display_code = %group_code::group_id_to_code(group_id),
            "Committed new group"
        );

        Ok(ResolutionOutcome {
            attempt_id,
            capture_id: capture.id,
            state: ResolutionState::Committed,
            matched: false,
            created: true,
            group_id: Some(group_id),
            group_display_code: Some(group_code::group_id_to_code(group_id)),
            shortlist,
            verification,
        })
    }

    /// A concurrent attempt assigned this capture first: return its result
    async fn lost_assignment_race(
        &self,
        attempt_id: Uuid,
        capture_id: i64,
        shortlist: Vec<ShortlistEntry>,
        verification: Option<VerifierDecision>,
    ) -> Result<ResolutionOutcome, ResolveError> {
        let capture = captures::load_capture(&self.db, capture_id)
            .await?
            .ok_or(ResolveError::CaptureNotFound(capture_id))?;
        let group_id = capture.group_id.ok_or_else(|| {
            ResolveError::Storage(anyhow::anyhow!(
                "capture {} lost the assignment race but has no group",
                capture_id
            ))
        })?;

        tracing::info!(
            %attempt_id,
            capture_id,
            group_id,
            "Concurrent attempt won; returning its assignment"
        );

        Ok(Self::outcome_matched(
            attempt_id,
            capture_id,
            group_id,
            shortlist,
            verification,
        ))
    }

    fn outcome_matched(
        attempt_id: Uuid,
        capture_id: i64,
        group_id: i64,
        shortlist: Vec<ShortlistEntry>,
        verification: Option<VerifierDecision>,
    ) -> ResolutionOutcome {
        ResolutionOutcome {
            attempt_id,
            capture_id,
            state: ResolutionState::Committed,
            matched: true,
            created: false,
            group_id: Some(group_id),
            group_display_code: Some(group_code::group_id_to_code(group_id)),
            shortlist,
            verification,
        }
    }
}
