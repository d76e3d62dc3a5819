//! Capture database operations (description store)
//!
//! **[IRE-DB-010]** Capture persistence

use crate::models::Capture;
use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// Parameters for inserting a new capture
#[derive(Debug, Clone)]
pub struct NewCapture {
    pub image_ref: String,
    pub description_schema: Option<serde_json::Value>,
    pub natural_summary: Option<String>,
    pub captured_at: Option<String>,
}

/// Insert a capture, returning its store-assigned id
///
/// Ids are assigned by AUTOINCREMENT and therefore monotonic; a capture is
/// never deleted as a side effect of grouping.
pub async fn insert_capture(pool: &SqlitePool, new: &NewCapture) -> Result<i64> {
    let schema_json = new
        .description_schema
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let result = sqlx::query(
        r#"
        INSERT INTO captures (image_ref, description_schema, natural_summary, captured_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&new.image_ref)
    .bind(schema_json)
    .bind(&new.natural_summary)
    .bind(&new.captured_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load a capture by id
pub async fn load_capture(pool: &SqlitePool, id: i64) -> Result<Option<Capture>> {
    let row = sqlx::query(
        r#"
        SELECT id, image_ref, description_schema, natural_summary,
               captured_at, created_at, group_id
        FROM captures
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(capture_from_row).transpose()
}

/// Persist a description obtained from the Describer after ingest
pub async fn update_description(
    pool: &SqlitePool,
    id: i64,
    schema: &serde_json::Value,
    natural_summary: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE captures
        SET description_schema = ?, natural_summary = ?
        WHERE id = ?
        "#,
    )
    .bind(serde_json::to_string(schema)?)
    .bind(natural_summary)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

fn capture_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Capture> {
    let schema_json: Option<String> = row.get("description_schema");
    let description_schema = schema_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(Capture {
        id: row.get("id"),
        image_ref: row.get("image_ref"),
        description_schema,
        natural_summary: row.get("natural_summary"),
        captured_at: row.get("captured_at"),
        created_at: row.get("created_at"),
        group_id: row.get("group_id"),
    })
}
