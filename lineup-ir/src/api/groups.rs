//! Group registry endpoints
//!
//! **[IRE-API-030]** GET /groups, GET /groups/:id

use crate::db::groups;
use crate::models::PersonGroup;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

/// Group listing response
#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub groups: Vec<PersonGroup>,
    pub total: usize,
}

/// GET /groups
///
/// All person-groups, newest first, with display codes.
pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Json<GroupListResponse>> {
    let groups = groups::list_groups(&state.db).await?;
    let total = groups.len();

    Ok(Json(GroupListResponse { groups, total }))
}

/// GET /groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
) -> ApiResult<Json<PersonGroup>> {
    let group = groups::load_group(&state.db, group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Group {} not found", group_id)))?;

    Ok(Json(group))
}

/// Build group routes
pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups))
        .route("/groups/:id", get(get_group))
}
