//! Aggregate review-state calculation.
//!
//! A gate's persisted `state` is a materialized view over its vote log.
//! This module owns the fold that derives that view, the updater that
//! applies it to a gate record, and the team-based reviewer auto-assign
//! used when a gate first becomes active.

use crate::models::{Gate, GateState, Vote, VoteState};
use crate::services::approval_defs::{self, ApprovalRule, Rule};

/// Fold a gate's votes into one aggregate state.
///
/// Votes are replayed in `set_on` order. The fold is order- and
/// count-sensitive:
/// - `review_requested` resets the approval tally and the visible state,
///   so approvals cast before a re-request no longer count toward the
///   threshold.
/// - `approved` bumps the tally; the gate reads approved once the tally
///   reaches the rule's threshold, and stays approved through later
///   reviewer signals other than a re-request.
/// - `na` satisfies the gate outright regardless of the rule.
/// - `needs_work`, `denied`, `review_started`, and `internal_review` each
///   become the visible state only while the gate is not yet satisfied.
/// - `no_response` rows (including unrecognized stored values) are inert.
///
/// Duplicate historical rows per reviewer are tolerated; the fold never
/// errors. An empty vote list yields `preparing`.
pub fn calc_gate_state(votes: &[Vote], rule: Rule) -> GateState {
    let mut ordered: Vec<&Vote> = votes.iter().collect();
    ordered.sort_by_key(|v| (v.set_on, v.id));

    let mut state = GateState::Preparing;
    let mut approvals: u32 = 0;

    for vote in ordered {
        match vote.state_enum() {
            VoteState::NoResponse => {}
            VoteState::ReviewRequested => {
                // A fresh request reopens the gate even if it was already
                // satisfied; the old approvals stay in the log but stop
                // counting.
                approvals = 0;
                state = GateState::ReviewRequested;
            }
            VoteState::Approved => {
                approvals += 1;
                if approvals >= rule.required_approvals() {
                    state = GateState::Approved;
                }
            }
            VoteState::Na => {
                if !state.is_satisfied() {
                    state = GateState::Na;
                }
            }
            VoteState::NeedsWork => {
                if !state.is_satisfied() {
                    state = GateState::NeedsWork;
                }
            }
            VoteState::Denied => {
                if !state.is_satisfied() {
                    state = GateState::Denied;
                }
            }
            VoteState::ReviewStarted => {
                if !state.is_satisfied() {
                    state = GateState::ReviewStarted;
                }
            }
            VoteState::InternalReview => {
                if !state.is_satisfied() {
                    state = GateState::InternalReview;
                }
            }
        }
    }

    state
}

/// Recompute a gate's aggregate state and apply it to the in-memory record
/// if it changed.
///
/// The gate's rule is looked up from `rules` by `gate_type`; unknown types
/// fall back to one-LGTM. The caller persists the gate when this returns
/// `true`; on `false` the record is untouched and no write is warranted.
///
/// # Arguments
/// * `gate` - Gate record to synchronize
/// * `votes` - Full current vote log for the gate
/// * `rules` - Approval-rule table
///
/// # Returns
/// Whether `gate.state` was changed.
pub fn update_gate_approval_state(
    gate: &mut Gate,
    votes: &[Vote],
    rules: &'static [ApprovalRule],
) -> bool {
    let rule = approval_defs::required_rule(rules, gate.gate_type);
    let new_state = calc_gate_state(votes, rule);

    if new_state == gate.state_enum() {
        return false;
    }

    gate.state = new_state.to_string();
    true
}

/// Find assignees to copy onto a newly active, unassigned gate.
///
/// Looks through the feature's other gates for the earliest-created gate
/// owned by the same review team that already has assignees, and returns
/// a copy of its list. Returns `None` when no such gate exists; the gate
/// then simply stays unassigned.
pub fn find_team_assignees(
    gate: &Gate,
    feature_gates: &[Gate],
    rules: &'static [ApprovalRule],
) -> Option<Vec<String>> {
    let team = approval_defs::rule_for_gate_type(rules, gate.gate_type)?.team_name;

    feature_gates
        .iter()
        .filter(|g| g.id != gate.id)
        .filter(|g| {
            approval_defs::rule_for_gate_type(rules, g.gate_type)
                .map(|r| r.team_name == team)
                .unwrap_or(false)
        })
        .map(|g| g.assignee_emails_vec())
        .find(|assignees| !assignees.is_empty())
}
