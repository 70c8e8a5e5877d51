//! Database queries for activity records (comments).

use crate::db::pool::DbPool;
use crate::models::Activity;

/// Insert a comment and return it.
pub async fn insert_activity(
    pool: &DbPool,
    feature_id: i64,
    gate_id: Option<i64>,
    author: &str,
    content: &str,
    now: i64,
) -> Result<Activity, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO activities (feature_id, gate_id, author, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(feature_id)
    .bind(gate_id)
    .bind(author)
    .bind(content)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    sqlx::query_as::<_, Activity>(
        "SELECT id, feature_id, gate_id, author, content, created_at FROM activities WHERE id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

/// Fetch every comment on a gate's review thread, oldest first.
pub async fn list_activities_for_gate(
    pool: &DbPool,
    gate_id: i64,
) -> Result<Vec<Activity>, sqlx::Error> {
    sqlx::query_as::<_, Activity>(
        r#"
        SELECT id, feature_id, gate_id, author, content, created_at
        FROM activities WHERE gate_id = ? ORDER BY created_at, id
        "#,
    )
    .bind(gate_id)
    .fetch_all(pool)
    .await
}
