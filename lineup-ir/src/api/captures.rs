//! Capture ingest and resolution endpoints
//!
//! **[IRE-API-020]** POST /captures, POST /captures/:id/resolve,
//! GET /captures/:id

use crate::db::captures::{self, NewCapture};
use crate::models::Capture;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

/// Request payload for ingesting a capture
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Opaque reference/URI to the rendered crop
    pub image_ref: String,
    /// Pre-computed structured description, if the caller already has one
    pub description_schema: Option<serde_json::Value>,
    /// Short textual summary of the description
    pub natural_summary: Option<String>,
    /// When the photo was taken (RFC 3339)
    pub captured_at: Option<String>,
}

/// Query parameters for resolution
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    /// Re-evaluate an already-grouped capture
    #[serde(default)]
    pub force: bool,
}

/// POST /captures
///
/// Stores the capture, then attempts to describe it immediately so the
/// later resolve call does not pay the describer round-trip. A describer
/// failure here is non-fatal: the capture is stored undescribed and
/// resolution retries the describer.
pub async fn ingest_capture(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> ApiResult<(StatusCode, Json<Capture>)> {
    if payload.image_ref.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "image_ref cannot be empty".to_string(),
        ));
    }

    let needs_description = match &payload.description_schema {
        Some(serde_json::Value::Object(map)) => map.is_empty(),
        Some(serde_json::Value::Null) | None => true,
        Some(_) => false,
    };

    let capture_id = captures::insert_capture(
        &state.db,
        &NewCapture {
            image_ref: payload.image_ref.clone(),
            description_schema: payload.description_schema,
            natural_summary: payload.natural_summary,
            captured_at: payload.captured_at,
        },
    )
    .await?;

    info!(capture_id, image_ref = %payload.image_ref, "Capture ingested");

    if needs_description {
        match state.describer.describe(&payload.image_ref).await {
            Ok(Some(description)) => {
                captures::update_description(
                    &state.db,
                    capture_id,
                    &description.schema,
                    description.natural_summary.as_deref(),
                )
                .await?;
                info!(capture_id, "Capture described on ingest");
            }
            Ok(None) => {
                info!(capture_id, "Describer produced no description on ingest");
            }
            Err(e) => {
                // Stored undescribed; resolve retries the describer
                warn!(capture_id, error = %e, "Describe-on-ingest failed");
            }
        }
    }

    let capture = captures::load_capture(&state.db, capture_id)
        .await?
        .ok_or_else(|| ApiError::Internal("Capture vanished after insert".to_string()))?;

    Ok((StatusCode::CREATED, Json(capture)))
}

/// POST /captures/:id/resolve?force=true
///
/// Runs the resolution state machine for the capture. Idempotent without
/// `force`; errors record the last-error diagnostic for /health.
pub async fn resolve_capture(
    State(state): State<AppState>,
    Path(capture_id): Path<i64>,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<Json<crate::models::ResolutionOutcome>> {
    match state.resolver.resolve(capture_id, query.force).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            *state.last_error.write().await = Some(e.to_string());
            Err(ApiError::from(e))
        }
    }
}

/// GET /captures/:id
pub async fn get_capture(
    State(state): State<AppState>,
    Path(capture_id): Path<i64>,
) -> ApiResult<Json<Capture>> {
    let capture = captures::load_capture(&state.db, capture_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Capture {} not found", capture_id)))?;

    Ok(Json(capture))
}

/// Build capture routes
pub fn capture_routes() -> Router<AppState> {
    Router::new()
        .route("/captures", post(ingest_capture))
        .route("/captures/:id", get(get_capture))
        .route("/captures/:id/resolve", post(resolve_capture))
}
