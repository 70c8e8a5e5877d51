//! Database queries for gates.

use crate::db::pool::DbPool;
use crate::models::{Gate, GateState};

/// Insert a gate row in the `preparing` state and return it.
pub async fn insert_gate(
    pool: &DbPool,
    feature_id: i64,
    stage_id: i64,
    gate_type: i64,
    now: i64,
) -> Result<Gate, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO gates (feature_id, stage_id, gate_type, state, assignee_emails, created_at, updated_at)
        VALUES (?, ?, ?, 'preparing', '[]', ?, ?)
        "#,
    )
    .bind(feature_id)
    .bind(stage_id)
    .bind(gate_type)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_gate(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Fetch a gate by ID.
pub async fn get_gate(pool: &DbPool, id: i64) -> Result<Option<Gate>, sqlx::Error> {
    sqlx::query_as::<_, Gate>(
        r#"
        SELECT id, feature_id, stage_id, gate_type, state, requested_on, responded_on,
               assignee_emails, next_action, additional_review, created_at, updated_at
        FROM gates WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Fetch all gates attached to a stage, oldest first.
pub async fn list_gates_for_stage(
    pool: &DbPool,
    stage_id: i64,
) -> Result<Vec<Gate>, sqlx::Error> {
    sqlx::query_as::<_, Gate>(
        r#"
        SELECT id, feature_id, stage_id, gate_type, state, requested_on, responded_on,
               assignee_emails, next_action, additional_review, created_at, updated_at
        FROM gates WHERE stage_id = ? ORDER BY id
        "#,
    )
    .bind(stage_id)
    .fetch_all(pool)
    .await
}

/// Fetch all gates attached to a feature, oldest first.
pub async fn list_gates_for_feature(
    pool: &DbPool,
    feature_id: i64,
) -> Result<Vec<Gate>, sqlx::Error> {
    sqlx::query_as::<_, Gate>(
        r#"
        SELECT id, feature_id, stage_id, gate_type, state, requested_on, responded_on,
               assignee_emails, next_action, additional_review, created_at, updated_at
        FROM gates WHERE feature_id = ? ORDER BY id
        "#,
    )
    .bind(feature_id)
    .fetch_all(pool)
    .await
}

/// Fetch every gate whose aggregate state is in the pending set, oldest
/// request first. These are the candidates for the overdue sweep.
pub async fn list_pending_gates(pool: &DbPool) -> Result<Vec<Gate>, sqlx::Error> {
    // Keep the IN list in sync with GateState::PENDING
    sqlx::query_as::<_, Gate>(
        r#"
        SELECT id, feature_id, stage_id, gate_type, state, requested_on, responded_on,
               assignee_emails, next_action, additional_review, created_at, updated_at
        FROM gates
        WHERE state IN ('review_requested', 'review_started', 'needs_work', 'internal_review')
        ORDER BY requested_on
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Overwrite a gate's aggregate state.
pub async fn update_gate_state(
    pool: &DbPool,
    gate_id: i64,
    state: GateState,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE gates SET state = ?, updated_at = ? WHERE id = ?")
        .bind(state.to_string())
        .bind(now)
        .bind(gate_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Stamp `requested_on` if it has never been set.
///
/// Re-requests after the first leave the original timestamp in place, so
/// the SLO clock keeps measuring from the first ask.
///
/// # Returns
/// `true` if this call set the timestamp, `false` if it was already set.
pub async fn mark_review_requested(
    pool: &DbPool,
    gate_id: i64,
    requested_on: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE gates SET requested_on = ?, updated_at = ? WHERE id = ? AND requested_on IS NULL",
    )
    .bind(requested_on)
    .bind(requested_on)
    .bind(gate_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Stamp `responded_on` if review was requested and nobody has responded
/// yet. One-shot: a second call never overwrites the first response time.
///
/// # Returns
/// `true` if this call set the timestamp, `false` otherwise.
pub async fn mark_responded(
    pool: &DbPool,
    gate_id: i64,
    responded_on: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE gates SET responded_on = ?, updated_at = ?
        WHERE id = ? AND requested_on IS NOT NULL AND responded_on IS NULL
        "#,
    )
    .bind(responded_on)
    .bind(now)
    .bind(gate_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrite a gate's assignee list.
///
/// `assignee_emails_json` must already be a serialized JSON array.
pub async fn update_assignees(
    pool: &DbPool,
    gate_id: i64,
    assignee_emails_json: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE gates SET assignee_emails = ?, updated_at = ? WHERE id = ?")
        .bind(assignee_emails_json)
        .bind(now)
        .bind(gate_id)
        .execute(pool)
        .await?;

    Ok(())
}
