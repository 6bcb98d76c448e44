//! String-keyed storage slot
//!
//! A slot holds one whole value per key. Writes replace the entire value;
//! callers that keep a collection in a slot do read-modify-write over the
//! full serialized form.

use crate::Result;
use sqlx::SqlitePool;

/// Read the value stored under `key`, or `None` when absent
pub async fn slot_get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM storage WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

/// Replace the whole value stored under `key`
pub async fn slot_put(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO storage (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove the value stored under `key`; removing an absent key is a no-op
pub async fn slot_delete(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM storage WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}
