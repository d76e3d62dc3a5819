//! Configuration resolution for lineup-ir
//!
//! Multi-tier resolution with Database → ENV → TOML priority for the
//! describer API key; collaborator base URLs come from TOML with
//! per-service environment overrides.

use lineup_common::config::TomlConfig;
use lineup_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Default collaborator base URLs (local sidecar ports)
const DEFAULT_DESCRIBER_URL: &str = "http://127.0.0.1:9301";
const DEFAULT_CLASSIFIER_URL: &str = "http://127.0.0.1:9302";
const DEFAULT_COMPARATOR_URL: &str = "http://127.0.0.1:9303";

/// Resolve describer API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_describer_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<String> {
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_key = crate::db::settings::get_describer_api_key(db).await?;
    if let Some(key) = &db_key {
        if is_valid_key(key) {
            sources.push("database");
        }
    }

    // Tier 2: Environment variable
    let env_key = std::env::var("LINEUP_DESCRIBER_API_KEY").ok();
    if let Some(key) = &env_key {
        if is_valid_key(key) {
            sources.push("environment");
        }
    }

    // Tier 3: TOML config
    let toml_key = toml_config.describer_api_key.as_ref();
    if let Some(key) = toml_key {
        if is_valid_key(key) {
            sources.push("TOML");
        }
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Describer API key found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    // Resolution priority
    if let Some(key) = db_key {
        if is_valid_key(&key) {
            info!("Describer API key loaded from database");
            return Ok(key);
        }
    }

    if let Some(key) = env_key {
        if is_valid_key(&key) {
            info!("Describer API key loaded from environment variable");
            return Ok(key);
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            info!("Describer API key loaded from TOML config");
            return Ok(key.clone());
        }
    }

    Err(Error::Config(
        "Describer API key not configured. Configure using one of:\n\
         1. Settings table: key 'describer_api_key'\n\
         2. Environment: LINEUP_DESCRIBER_API_KEY=your-key-here\n\
         3. TOML config: lineup.toml (describer_api_key = \"your-key\")"
            .to_string(),
    ))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a collaborator base URL: ENV → TOML → default
fn resolve_url(env_var: &str, toml_value: Option<&String>, default: &str) -> String {
    if let Ok(url) = std::env::var(env_var) {
        if !url.trim().is_empty() {
            return url;
        }
    }
    toml_value
        .filter(|u| !u.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

/// Describer service base URL
pub fn describer_url(toml_config: &TomlConfig) -> String {
    resolve_url(
        "LINEUP_DESCRIBER_URL",
        toml_config.describer_url.as_ref(),
        DEFAULT_DESCRIBER_URL,
    )
}

/// Grouping classifier service base URL
pub fn classifier_url(toml_config: &TomlConfig) -> String {
    resolve_url(
        "LINEUP_CLASSIFIER_URL",
        toml_config.classifier_url.as_ref(),
        DEFAULT_CLASSIFIER_URL,
    )
}

/// Visual comparator service base URL
pub fn comparator_url(toml_config: &TomlConfig) -> String {
    resolve_url(
        "LINEUP_COMPARATOR_URL",
        toml_config.comparator_url.as_ref(),
        DEFAULT_COMPARATOR_URL,
    )
}
