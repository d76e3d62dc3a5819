//! Group identifier allocator
//!
//! **[IRE-ALLOC-010]** Collision-free, monotonically increasing group ids
//! under concurrent allocators.
//!
//! Backed by the durable single-row `group_id_sequence` table, not an
//! in-process counter and not a `MAX(id)+1` read — both race once multiple
//! request handlers run concurrently. The increment is a single atomic
//! UPDATE…RETURNING executed on the pool, outside any enclosing commit
//! transaction: an allocated id is never reused even if that transaction
//! later rolls back. A gap in the sequence is acceptable; a collision is not.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// Allocate the next group id
///
/// Returns a value strictly greater than every previously allocated id.
pub async fn allocate_group_id(pool: &SqlitePool) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        "UPDATE group_id_sequence SET next_id = next_id + 1 WHERE id = 1 RETURNING next_id",
    )
    .fetch_one(pool)
    .await
    .context("group id sequence not initialized")?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        lineup_common::db::init::create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_allocate_starts_after_seed() {
        let pool = test_pool().await;
        assert_eq!(allocate_group_id(&pool).await.unwrap(), 1);
        assert_eq!(allocate_group_id(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_allocation_survives_rollback() {
        // File-backed database: the enclosing transaction and the allocator
        // must run on separate connections to the same store
        let temp_dir = tempfile::TempDir::new().unwrap();
        let pool = lineup_common::db::init_database(&temp_dir.path().join("lineup.db"))
            .await
            .unwrap();

        let first = allocate_group_id(&pool).await.unwrap();

        // Simulate an enclosing transaction that rolls back after allocation
        let tx = pool.begin().await.unwrap();
        let inside = allocate_group_id(&pool).await.unwrap();
        tx.rollback().await.unwrap();

        let after = allocate_group_id(&pool).await.unwrap();

        assert!(inside > first);
        assert!(after > inside, "rolled-back transaction must not recycle ids");
    }

    #[tokio::test]
    async fn test_missing_sequence_row_errors() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE group_id_sequence (id INTEGER PRIMARY KEY CHECK (id = 1), next_id INTEGER NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        assert!(allocate_group_id(&pool).await.is_err());
    }
}
