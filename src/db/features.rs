//! Database queries for features and stages.

use crate::db::pool::DbPool;
use crate::models::{Feature, Stage};

/// Insert a feature row and return it.
///
/// `owner_emails_json` must already be a serialized JSON array.
pub async fn insert_feature(
    pool: &DbPool,
    name: &str,
    owner_emails_json: &str,
    now: i64,
) -> Result<Feature, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO features (name, owner_emails, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(owner_emails_json)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_feature(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Fetch a feature by ID.
pub async fn get_feature(pool: &DbPool, id: i64) -> Result<Option<Feature>, sqlx::Error> {
    sqlx::query_as::<_, Feature>(
        "SELECT id, name, owner_emails, created_at, updated_at FROM features WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Insert a stage row and return it.
pub async fn insert_stage(
    pool: &DbPool,
    feature_id: i64,
    stage_type: &str,
    now: i64,
) -> Result<Stage, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO stages (feature_id, stage_type, created_at) VALUES (?, ?, ?)",
    )
    .bind(feature_id)
    .bind(stage_type)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_stage(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Fetch a stage by ID.
pub async fn get_stage(pool: &DbPool, id: i64) -> Result<Option<Stage>, sqlx::Error> {
    sqlx::query_as::<_, Stage>(
        "SELECT id, feature_id, stage_type, created_at FROM stages WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
