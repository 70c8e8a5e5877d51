//! Database queries for the vote log.

use crate::db::pool::DbPool;
use crate::models::{Vote, VoteState};

/// Fetch every vote on a gate, oldest first.
pub async fn list_votes_for_gate(
    pool: &DbPool,
    gate_id: i64,
) -> Result<Vec<Vote>, sqlx::Error> {
    sqlx::query_as::<_, Vote>(
        r#"
        SELECT id, feature_id, gate_id, gate_type, state, set_on, set_by
        FROM votes WHERE gate_id = ? ORDER BY set_on, id
        "#,
    )
    .bind(gate_id)
    .fetch_all(pool)
    .await
}

/// Record a reviewer's vote, superseding any earlier vote they cast on the
/// same gate.
///
/// Update-then-insert rather than ON CONFLICT: the table carries no
/// uniqueness constraint, and a racing pair of writes at worst leaves a
/// duplicate row the aggregate calculator already tolerates.
pub async fn save_vote(
    pool: &DbPool,
    feature_id: i64,
    gate_id: i64,
    gate_type: i64,
    state: VoteState,
    set_on: i64,
    set_by: &str,
) -> Result<(), sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE votes SET state = ?, set_on = ? WHERE gate_id = ? AND set_by = ?",
    )
    .bind(state.to_string())
    .bind(set_on)
    .bind(gate_id)
    .bind(set_by)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO votes (feature_id, gate_id, gate_type, state, set_on, set_by)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(feature_id)
        .bind(gate_id)
        .bind(gate_type)
        .bind(state.to_string())
        .bind(set_on)
        .bind(set_by)
        .execute(pool)
        .await?;
    }

    Ok(())
}
