//! Database initialization
//!
//! Creates the database on first run with the full schema, enables WAL and
//! foreign keys, and seeds the settings table with resolution defaults.
//! Every step is idempotent — safe to run on every startup.

use crate::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Per-connection options: foreign keys and the busy timeout must be set
    // on every pooled connection, not just the first. WAL lets concurrent
    // resolution requests read while one commits; the busy timeout makes
    // racing commits wait instead of erroring.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
///
/// Exposed separately so tests can build a schema on an in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_captures_table(pool).await?;
    create_person_groups_table(pool).await?;
    create_group_id_sequence_table(pool).await?;
    create_settings_table(pool).await?;
    Ok(())
}

/// Create the captures table
///
/// One row per analyzed photo. `description_schema` is the structured
/// appearance profile serialized as JSON; `group_id` stays NULL until
/// resolution commits or grouping was skipped.
pub async fn create_captures_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS captures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_ref TEXT NOT NULL,
            description_schema TEXT,
            natural_summary TEXT,
            captured_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            group_id INTEGER REFERENCES person_groups(id),
            CHECK (length(image_ref) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_captures_group_id ON captures(group_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the person_groups table
///
/// The canonical identity buckets. `member_count` is a cached count of
/// captures referencing the group, maintained inside the same transaction
/// that assigns a capture's `group_id`.
pub async fn create_person_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS person_groups (
            id INTEGER PRIMARY KEY,
            representative_capture_id INTEGER NOT NULL REFERENCES captures(id),
            member_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (member_count >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_person_groups_representative ON person_groups(representative_capture_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the group id sequence table
///
/// Single-row durable counter backing the identifier allocator. Seeded to
/// MAX(id) over any pre-existing groups so data inserted before the
/// allocator existed can never collide with newly allocated ids.
pub async fn create_group_id_sequence_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS group_id_sequence (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            next_id INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // INSERT OR IGNORE handles concurrent initialization races
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO group_id_sequence (id, next_id)
        SELECT 1, COALESCE(MAX(id), 0) FROM person_groups
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all recognized resolution options exist with default values.
/// NULL values are reset to defaults.
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Resolution decision options
    ensure_setting(pool, "match_accept_threshold", "75").await?;
    ensure_setting(pool, "vision_shortlist_size", "3").await?;
    ensure_setting(pool, "vision_accept_similarity", "90").await?;
    ensure_setting(pool, "vision_confidence_requirement", "high").await?;

    // External call handling
    ensure_setting(pool, "external_call_timeout_ms", "30000").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
            .bind(key)
            .fetch_one(pool)
            .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization race conditions:
        // multiple tasks may pass the exists check simultaneously
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
