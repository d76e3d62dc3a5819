//! Group registry database operations
//!
//! **[IRE-DB-020]** Person-group persistence

use crate::models::PersonGroup;
use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// A candidate group with its canonical comparison payload
///
/// The canonical description is the representative capture's schema (not a
/// blended one); `natural_summary` is the fallback when the representative
/// predates structured descriptions.
#[derive(Debug, Clone)]
pub struct GroupCandidate {
    pub group_id: i64,
    pub schema: Option<serde_json::Value>,
    pub natural_summary: Option<String>,
}

/// Representative payload used by the vision verifier
#[derive(Debug, Clone)]
pub struct GroupRepresentative {
    pub group_id: i64,
    pub image_ref: String,
    pub natural_summary: Option<String>,
    pub captured_at: Option<String>,
}

/// Load a group by id
pub async fn load_group(pool: &SqlitePool, id: i64) -> Result<Option<PersonGroup>> {
    let row = sqlx::query(
        r#"
        SELECT id, representative_capture_id, member_count, created_at, updated_at
        FROM person_groups
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(group_from_row))
}

/// List all groups, newest first
pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<PersonGroup>> {
    let rows = sqlx::query(
        r#"
        SELECT id, representative_capture_id, member_count, created_at, updated_at
        FROM person_groups
        ORDER BY id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(group_from_row).collect())
}

/// Load every group's canonical comparison payload for shortlisting
///
/// Joins each group to its representative capture. Groups whose
/// representative has neither a schema nor a summary still appear — the
/// classifier decides what to do with sparse candidates.
pub async fn load_candidates(pool: &SqlitePool) -> Result<Vec<GroupCandidate>> {
    let rows = sqlx::query(
        r#"
        SELECT g.id AS group_id, c.description_schema, c.natural_summary
        FROM person_groups g
        JOIN captures c ON c.id = g.representative_capture_id
        ORDER BY g.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let schema_json: Option<String> = row.get("description_schema");
            let schema = schema_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;
            Ok(GroupCandidate {
                group_id: row.get("group_id"),
                schema,
                natural_summary: row.get("natural_summary"),
            })
        })
        .collect()
}

/// Load representative payloads for the given groups (verifier input)
pub async fn load_representatives(
    pool: &SqlitePool,
    group_ids: &[i64],
) -> Result<Vec<GroupRepresentative>> {
    let mut representatives = Vec::with_capacity(group_ids.len());

    for &group_id in group_ids {
        let row = sqlx::query(
            r#"
            SELECT g.id AS group_id, c.image_ref, c.natural_summary, c.captured_at
            FROM person_groups g
            JOIN captures c ON c.id = g.representative_capture_id
            WHERE g.id = ?
            "#,
        )
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

        if let Some(row) = row {
            representatives.push(GroupRepresentative {
                group_id: row.get("group_id"),
                image_ref: row.get("image_ref"),
                natural_summary: row.get("natural_summary"),
                captured_at: row.get("captured_at"),
            });
        }
    }

    Ok(representatives)
}

fn group_from_row(row: sqlx::sqlite::SqliteRow) -> PersonGroup {
    PersonGroup::from_row(
        row.get("id"),
        row.get("representative_capture_id"),
        row.get("member_count"),
        row.get("created_at"),
        row.get("updated_at"),
    )
}
