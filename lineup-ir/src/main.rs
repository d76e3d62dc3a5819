//! lineup-ir - Identity Resolution Engine
//!
//! **Module Identity:**
//! - Name: lineup-ir (Identity Resolution)
//! - Port: 9300
//!
//! **[IRE-OV-010]** Assigns each analyzed photo to a person-group:
//! matches against existing groups via description scoring and visual
//! verification, or creates a new group when nothing is acceptable.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lineup_ir::db::settings::ResolutionOptions;
use lineup_ir::services::classifier::ClassifierClient;
use lineup_ir::services::comparator::ComparatorClient;
use lineup_ir::services::describer::DescriberClient;
use lineup_ir::services::resolver::ResolutionOrchestrator;
use lineup_ir::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let toml_path = lineup_common::config::config_file_path();
    let toml_config = lineup_common::config::load_toml_config(&toml_path)?;

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting lineup-ir (Identity Resolution) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let db_path = std::env::var("LINEUP_DB")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("lineup.db"));
    info!("Database: {}", db_path.display());

    let db_pool = lineup_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    let options = ResolutionOptions::load(&db_pool).await?;
    let timeout_ms = options.external_call_timeout_ms;

    let describer_api_key =
        lineup_ir::config::resolve_describer_api_key(&db_pool, &toml_config).await?;

    let describer = Arc::new(DescriberClient::new(
        lineup_ir::config::describer_url(&toml_config),
        describer_api_key,
        timeout_ms,
    )?);
    let classifier = Arc::new(ClassifierClient::new(
        lineup_ir::config::classifier_url(&toml_config),
        timeout_ms,
    )?);
    let comparator = Arc::new(ComparatorClient::new(
        lineup_ir::config::comparator_url(&toml_config),
        timeout_ms,
    )?);

    let resolver = Arc::new(ResolutionOrchestrator::new(
        db_pool.clone(),
        describer.clone(),
        classifier,
        comparator,
    ));

    let state = AppState::new(db_pool, resolver, describer);
    let app = lineup_ir::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:9300").await?;
    info!("Listening on http://127.0.0.1:9300");
    info!("Health check: http://127.0.0.1:9300/health");

    axum::serve(listener, app).await?;

    Ok(())
}
