//! lineup-ir library interface
//!
//! **[IRE-OV-010]** Identity resolution engine: assigns each analyzed
//! photo (capture) to a person-group by comparing appearance descriptions
//! and, for close calls, the images themselves. Exposes public APIs for
//! integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use services::describer::Describer;
use services::resolver::ResolutionOrchestrator;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolution orchestrator (shared; attempts are independent)
    pub resolver: Arc<ResolutionOrchestrator>,
    /// Describer, used directly for describe-on-ingest
    pub describer: Arc<dyn Describer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last resolution error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        resolver: Arc<ResolutionOrchestrator>,
        describer: Arc<dyn Describer>,
    ) -> Self {
        Self {
            db,
            resolver,
            describer,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::capture_routes())
        .merge(api::group_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
