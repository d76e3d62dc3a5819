//! Settings database operations
//!
//! Get/set accessors for the settings table following the key-value
//! pattern. The four recognized resolution options are read here; defaults
//! match `lineup_common::db::init::init_default_settings`.

use lineup_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Resolution options loaded from the settings table
#[derive(Debug, Clone)]
pub struct ResolutionOptions {
    /// Minimum shortlist probability for a textual accept (default 75)
    pub match_accept_threshold: i64,
    /// How many top candidates the vision verifier examines (default 3)
    pub vision_shortlist_size: usize,
    /// Minimum visual similarity for a verifier accept (default 90)
    pub vision_accept_similarity: i64,
    /// Whether only "high" comparator confidence is acceptable (default)
    /// or "any" tier is allowed
    pub require_high_confidence: bool,
    /// Timeout applied to each external collaborator call
    pub external_call_timeout_ms: u64,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            match_accept_threshold: 75,
            vision_shortlist_size: 3,
            vision_accept_similarity: 90,
            require_high_confidence: true,
            external_call_timeout_ms: 30_000,
        }
    }
}

impl ResolutionOptions {
    /// Load options from the settings table, falling back to defaults for
    /// missing keys
    pub async fn load(db: &Pool<Sqlite>) -> Result<Self> {
        let defaults = Self::default();

        let confidence_requirement = get_setting::<String>(db, "vision_confidence_requirement")
            .await?
            .unwrap_or_else(|| "high".to_string());

        Ok(Self {
            match_accept_threshold: get_setting(db, "match_accept_threshold")
                .await?
                .unwrap_or(defaults.match_accept_threshold),
            vision_shortlist_size: get_setting(db, "vision_shortlist_size")
                .await?
                .unwrap_or(defaults.vision_shortlist_size),
            vision_accept_similarity: get_setting(db, "vision_accept_similarity")
                .await?
                .unwrap_or(defaults.vision_accept_similarity),
            require_high_confidence: confidence_requirement.eq_ignore_ascii_case("high"),
            external_call_timeout_ms: get_setting(db, "external_call_timeout_ms")
                .await?
                .unwrap_or(defaults.external_call_timeout_ms),
        })
    }
}

/// Get describer API key from database
///
/// Returns Some(key) if set, None otherwise.
pub async fn get_describer_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, "describer_api_key").await
}

/// Set describer API key in database
pub async fn set_describer_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, "describer_api_key", key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
