//! Review workflow orchestration.
//!
//! These operations tie the pure pieces together: they load gate and vote
//! rows, append to the vote log, run the aggregate-state fold, and keep
//! the SLO timestamps up to date. Each operation samples the clock once
//! and uses that instant for every step.

use log::info;

use crate::db::pool::DbPool;
use crate::db::{activities, features, gates, votes};
use crate::error::AppError;
use crate::models::{Activity, Feature, Gate, NewFeature, Stage, StageType, VoteState};
use crate::services::approval_defs::{self, APPROVAL_RULES, DEFAULT_SLO_LIMIT};
use crate::services::review_state;
use crate::services::slo::{self, Clock};

/// Create a feature.
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `clock` - Time source, sampled once
/// * `new_feature` - Name and owner list
///
/// # Returns
/// The created feature row.
pub async fn create_feature(
    pool: &DbPool,
    clock: &dyn Clock,
    new_feature: &NewFeature,
) -> Result<Feature, AppError> {
    if new_feature.name.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            "Feature name cannot be empty",
            "name",
        ));
    }

    let now = clock.now().timestamp();
    let owners_json = serde_json::to_string(&new_feature.owner_emails)?;

    let feature = features::insert_feature(pool, &new_feature.name, &owners_json, now)
        .await
        .map_err(|e| AppError::database_with_op(e.to_string(), "create_feature"))?;

    info!("[review] Created feature {} '{}'", feature.id, feature.name);
    Ok(feature)
}

/// Create a stage on a feature, spawning the review gates that stage type
/// requires. Every spawned gate starts in `preparing`.
///
/// # Returns
/// The created stage and its gates, in gate-type order.
pub async fn create_stage(
    pool: &DbPool,
    clock: &dyn Clock,
    feature_id: i64,
    stage_type: StageType,
) -> Result<(Stage, Vec<Gate>), AppError> {
    let now = clock.now().timestamp();

    features::get_feature(pool, feature_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("feature", feature_id.to_string()))?;

    let stage = features::insert_stage(pool, feature_id, &stage_type.to_string(), now)
        .await
        .map_err(|e| AppError::database_with_op(e.to_string(), "create_stage"))?;

    let mut stage_gates = Vec::new();
    for gate_type in approval_defs::gates_for_stage_type(stage_type) {
        let gate = gates::insert_gate(pool, feature_id, stage.id, *gate_type, now)
            .await
            .map_err(|e| AppError::database_with_op(e.to_string(), "create_stage"))?;
        stage_gates.push(gate);
    }

    info!(
        "[review] Created {} stage {} on feature {} with {} gate(s)",
        stage.stage_type,
        stage.id,
        feature_id,
        stage_gates.len()
    );
    Ok((stage, stage_gates))
}

/// Record a reviewer's vote on a gate and synchronize the gate with it.
///
/// Supersedes any earlier vote by the same reviewer, recomputes the
/// aggregate state from the full vote log, and persists the state only if
/// it changed. The first `review_requested` vote starts the SLO clock and
/// triggers reviewer auto-assignment; later re-requests leave the
/// original request time in place. Votes other than `review_requested`
/// may stop the SLO clock by stamping the gate's first response time.
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `clock` - Time source, sampled once
/// * `gate_id` - Gate being voted on
/// * `set_by` - Reviewer identity
/// * `state` - The vote being cast
///
/// # Returns
/// The gate row as it stands after the vote.
pub async fn set_vote(
    pool: &DbPool,
    clock: &dyn Clock,
    gate_id: i64,
    set_by: &str,
    state: VoteState,
) -> Result<Gate, AppError> {
    if set_by.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            "Reviewer identity cannot be empty",
            "set_by",
        ));
    }

    let now = clock.now();
    let now_ts = now.timestamp();

    let mut gate = gates::get_gate(pool, gate_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("gate", gate_id.to_string()))?;

    votes::save_vote(
        pool,
        gate.feature_id,
        gate.id,
        gate.gate_type,
        state,
        now_ts,
        set_by,
    )
    .await
    .map_err(|e| AppError::database_with_op(e.to_string(), "set_vote"))?;

    if state == VoteState::ReviewRequested {
        let newly_requested = gates::mark_review_requested(pool, gate.id, now_ts).await?;
        if newly_requested {
            gate.requested_on = Some(now_ts);
            info!("[review] Review requested on gate {}", gate.id);
            auto_assign(pool, &mut gate, now_ts).await?;
        }
    }

    let vote_log = votes::list_votes_for_gate(pool, gate.id).await?;

    if review_state::update_gate_approval_state(&mut gate, &vote_log, APPROVAL_RULES) {
        gates::update_gate_state(pool, gate.id, gate.state_enum(), now_ts).await?;
        info!("[review] Gate {} moved to {}", gate.id, gate.state);
    }

    // A request starts the clock; any other vote can stop it
    if state != VoteState::ReviewRequested && slo::record_vote(&mut gate, &vote_log) {
        if let Some(responded_on) = gate.responded_on {
            gates::mark_responded(pool, gate.id, responded_on, now_ts).await?;
        }
    }

    Ok(gate)
}

/// Copy assignees from the feature's earliest same-team gate, if the gate
/// has none of its own. Leaves the gate unassigned when no donor exists.
async fn auto_assign(pool: &DbPool, gate: &mut Gate, now_ts: i64) -> Result<(), AppError> {
    if !gate.assignee_emails_vec().is_empty() {
        return Ok(());
    }

    let feature_gates = gates::list_gates_for_feature(pool, gate.feature_id).await?;
    if let Some(assignees) = review_state::find_team_assignees(gate, &feature_gates, APPROVAL_RULES)
    {
        let assignees_json = serde_json::to_string(&assignees)?;
        gates::update_assignees(pool, gate.id, &assignees_json, now_ts).await?;
        gate.assignee_emails = assignees_json;
        info!(
            "[review] Auto-assigned {} reviewer(s) to gate {}",
            assignees.len(),
            gate.id
        );
    }

    Ok(())
}

/// Post a comment on a gate's review thread.
///
/// The comment is always recorded. If the author is an approver for the
/// gate and the review team still owes its first response, the comment
/// also stops the SLO clock.
///
/// # Returns
/// The recorded activity row.
pub async fn post_gate_comment(
    pool: &DbPool,
    clock: &dyn Clock,
    gate_id: i64,
    author: &str,
    content: &str,
) -> Result<Activity, AppError> {
    if author.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            "Comment author cannot be empty",
            "author",
        ));
    }
    if content.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            "Comment cannot be empty",
            "content",
        ));
    }

    let now = clock.now();

    let mut gate = gates::get_gate(pool, gate_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("gate", gate_id.to_string()))?;

    let feature = features::get_feature(pool, gate.feature_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("feature", gate.feature_id.to_string()))?;

    let activity = activities::insert_activity(
        pool,
        gate.feature_id,
        Some(gate.id),
        author,
        content,
        now.timestamp(),
    )
    .await
    .map_err(|e| AppError::database_with_op(e.to_string(), "post_gate_comment"))?;

    let approvers = approvers_for_gate(&gate);
    if slo::record_comment(&feature, &mut gate, author, &approvers, now) {
        if let Some(responded_on) = gate.responded_on {
            gates::mark_responded(pool, gate.id, responded_on, now.timestamp()).await?;
        }
    }

    Ok(activity)
}

/// Everyone whose comment counts as the review team responding: the
/// gate's assignees plus the owning team's escalation contact.
fn approvers_for_gate(gate: &Gate) -> Vec<String> {
    let mut approvers = gate.assignee_emails_vec();
    if let Some(rule) = approval_defs::rule_for_gate_type(APPROVAL_RULES, gate.gate_type) {
        let contact = rule.escalation_email.to_string();
        if !approvers.contains(&contact) {
            approvers.push(contact);
        }
    }
    approvers
}

/// All pending gates whose review team has blown its first-response SLO,
/// ready to hand to an escalation collaborator.
pub async fn get_overdue_gates(pool: &DbPool, clock: &dyn Clock) -> Result<Vec<Gate>, AppError> {
    let now = clock.now();
    let pending = gates::list_pending_gates(pool).await?;
    Ok(slo::filter_overdue(
        &pending,
        APPROVAL_RULES,
        DEFAULT_SLO_LIMIT,
        now,
    ))
}
