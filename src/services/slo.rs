//! Weekday SLO timer for review response deadlines.
//!
//! Review teams owe a first response within a fixed number of business
//! days. All day counting happens in the US/Pacific civil calendar no
//! matter what timezone the stored timestamps carry; DST shifts are
//! absorbed by the calendar conversion rather than fixed offsets.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use log::info;

use crate::models::{Feature, Gate, Vote};
use crate::services::approval_defs::{self, ApprovalRule};

/// Civil calendar all deadline math runs in.
const PACIFIC: chrono_tz::Tz = chrono_tz::US::Pacific;

/// Safety bound on the day-walk in [`weekdays_between`].
const MAX_DAYS: i64 = 9999;

/// Time source for deadline checks.
///
/// Production wires [`SystemClock`]; tests supply a fixed instant so day
/// counts are deterministic. Callers sample the clock once per logical
/// operation and pass the instant down, so a multi-step calculation never
/// sees two different "now" values.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock reading the system time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whether the datetime falls on a Monday through Friday, judged on its
/// own calendar date. Callers convert to the timezone they care about
/// first.
pub fn is_weekday<Tz: TimeZone>(dt: &DateTime<Tz>) -> bool {
    !matches!(dt.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Count the weekdays between two instants in the US/Pacific calendar.
///
/// The remainder of the start's calendar day is treated as already
/// consumed: counting begins at 23:59:59 of the start's Pacific date and
/// walks forward one civil day at a time, counting the days that land on
/// a weekday, until the walk passes `end`. The day containing `start`
/// itself therefore never counts, and a same-day pair yields 0.
///
/// Never negative: if `end` is at or before the start of counting the
/// result is 0. The walk is capped at [`MAX_DAYS`] days.
pub fn weekdays_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let start_local = start.with_timezone(&PACIFIC).naive_local();
    let end_local = end.with_timezone(&PACIFIC).naive_local();

    let Some(mut pointer) = start_local.date().and_hms_opt(23, 59, 59) else {
        return 0;
    };

    let mut weekdays = 0;
    let mut iterations = 0;
    while pointer < end_local && iterations < MAX_DAYS {
        pointer += Duration::days(1);
        iterations += 1;
        if !matches!(pointer.weekday(), Weekday::Sat | Weekday::Sun) {
            weekdays += 1;
        }
    }

    weekdays
}

/// Weekdays left before a review's first response is due.
///
/// Positive means days remain, zero means due today, negative means
/// overdue by that many weekdays. `now` is sampled once by the caller.
pub fn remaining_days(
    requested_on: DateTime<Utc>,
    slo_limit_days: i64,
    now: DateTime<Utc>,
) -> i64 {
    slo_limit_days - weekdays_between(requested_on, now)
}

/// Stamp `responded_on` from the vote log, if a response is still owed.
///
/// Qualifying votes are those cast strictly after `requested_on`; the
/// latest one supplies the timestamp. One-shot: once `responded_on` is
/// set this never overwrites it.
///
/// # Returns
/// `true` if this call stamped the gate, `false` otherwise.
pub fn record_vote(gate: &mut Gate, votes: &[Vote]) -> bool {
    let Some(requested_on) = gate.requested_on else {
        return false;
    };
    if gate.responded_on.is_some() {
        return false;
    }

    let latest_response = votes
        .iter()
        .map(|v| v.set_on)
        .filter(|set_on| *set_on > requested_on)
        .max();

    match latest_response {
        Some(set_on) => {
            gate.responded_on = Some(set_on);
            true
        }
        None => false,
    }
}

/// Stamp `responded_on` from a reviewer's comment, if a response is still
/// owed.
///
/// Only a comment from someone in `approvers` counts as the review team
/// responding; feature owners chatting on the thread do not stop the
/// clock. Stamps the current time rather than a vote timestamp. One-shot,
/// same as [`record_vote`].
///
/// # Returns
/// `true` if this call stamped the gate, `false` otherwise.
pub fn record_comment(
    feature: &Feature,
    gate: &mut Gate,
    user: &str,
    approvers: &[String],
    now: DateTime<Utc>,
) -> bool {
    if gate.requested_on.is_none() || gate.responded_on.is_some() {
        return false;
    }
    if !approvers.iter().any(|a| a == user) {
        return false;
    }

    gate.responded_on = Some(now.timestamp());
    info!(
        "[slo] First response on gate {} of '{}' recorded from comment by {}",
        gate.id, feature.name, user
    );
    true
}

/// Whether a gate's first response has blown its weekday SLO.
///
/// False when review was never requested or has already been answered;
/// otherwise true iff the remaining days are negative. Unknown gate types
/// use `default_slo_limit`.
pub fn is_gate_overdue(
    gate: &Gate,
    rules: &'static [ApprovalRule],
    default_slo_limit: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some(requested_ts) = gate.requested_on else {
        return false;
    };
    if gate.responded_on.is_some() {
        return false;
    }
    let Some(requested_on) = DateTime::from_timestamp(requested_ts, 0) else {
        return false;
    };

    let limit = approval_defs::slo_limit_for(rules, gate.gate_type, default_slo_limit);
    remaining_days(requested_on, limit, now) < 0
}

/// Filter pre-fetched gates down to pending ones that have blown their
/// SLO.
pub fn filter_overdue(
    gates: &[Gate],
    rules: &'static [ApprovalRule],
    default_slo_limit: i64,
    now: DateTime<Utc>,
) -> Vec<Gate> {
    gates
        .iter()
        .filter(|g| g.state_enum().is_pending())
        .filter(|g| is_gate_overdue(g, rules, default_slo_limit, now))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::approval_defs::{Rule, APPROVAL_RULES, DEFAULT_SLO_LIMIT};

    /// Chosen test week: Monday 2025-01-13 through Monday 2025-01-20.
    fn pacific(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        PACIFIC
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn sample_gate(gate_type: i64) -> Gate {
        Gate {
            id: 1,
            feature_id: 1,
            stage_id: 1,
            gate_type,
            state: "review_requested".to_string(),
            requested_on: None,
            responded_on: None,
            assignee_emails: "[]".to_string(),
            next_action: None,
            additional_review: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn sample_feature() -> Feature {
        Feature {
            id: 1,
            name: "CSS Nesting".to_string(),
            owner_emails: r#"["owner@example.com"]"#.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn vote_at(set_on: i64) -> Vote {
        Vote {
            id: 1,
            feature_id: 1,
            gate_id: 1,
            gate_type: 1,
            state: "approved".to_string(),
            set_on,
            set_by: "reviewer@example.com".to_string(),
        }
    }

    #[test]
    fn test_is_weekday() {
        assert!(is_weekday(&pacific(2025, 1, 13, 12, 0))); // Monday
        assert!(is_weekday(&pacific(2025, 1, 17, 12, 0))); // Friday
        assert!(!is_weekday(&pacific(2025, 1, 18, 12, 0))); // Saturday
        assert!(!is_weekday(&pacific(2025, 1, 19, 12, 0))); // Sunday
    }

    #[test]
    fn test_weekdays_between_same_day() {
        // Wednesday morning to the same Wednesday afternoon
        let start = pacific(2025, 1, 15, 12, 30);
        let end = pacific(2025, 1, 15, 14, 15);
        assert_eq!(weekdays_between(start, end), 0);
    }

    #[test]
    fn test_weekdays_between_friday_to_saturday() {
        // Friday doesn't count as the start day and Saturday is a weekend
        let start = pacific(2025, 1, 17, 12, 30);
        let end = pacific(2025, 1, 18, 14, 15);
        assert_eq!(weekdays_between(start, end), 0);
    }

    #[test]
    fn test_weekdays_between_over_a_weekend() {
        // Wednesday to the following Monday: Thu, Fri, Mon
        let start = pacific(2025, 1, 15, 12, 0);
        let end = pacific(2025, 1, 20, 12, 0);
        assert_eq!(weekdays_between(start, end), 3);
    }

    #[test]
    fn test_weekdays_between_full_week() {
        // Monday to the next Monday is five working days
        let start = pacific(2025, 1, 13, 9, 0);
        let end = pacific(2025, 1, 20, 9, 0);
        assert_eq!(weekdays_between(start, end), 5);
    }

    #[test]
    fn test_weekdays_between_never_negative() {
        let start = pacific(2025, 1, 15, 12, 0);
        let end = pacific(2025, 1, 10, 12, 0);
        assert_eq!(weekdays_between(start, end), 0);
        assert_eq!(weekdays_between(start, start), 0);
    }

    #[test]
    fn test_weekdays_between_across_dst_change() {
        // US DST started Sunday 2025-03-09; the clocks jumping forward
        // must not add or drop a day
        let start = pacific(2025, 3, 7, 15, 0); // Friday before
        let end = pacific(2025, 3, 10, 9, 0); // Monday after
        assert_eq!(weekdays_between(start, end), 1);
    }

    #[test]
    fn test_weekdays_between_is_capped() {
        let start = pacific(2000, 1, 3, 0, 0);
        let end = pacific(2100, 1, 4, 0, 0);
        let counted = weekdays_between(start, end);
        assert!(counted <= MAX_DAYS);
        // The walk still made real progress before hitting the bound
        assert!(counted > 7_000);
    }

    #[test]
    fn test_remaining_days() {
        let requested = pacific(2025, 1, 15, 10, 0); // Wednesday

        // Same day: the full limit remains
        assert_eq!(remaining_days(requested, 5, pacific(2025, 1, 15, 16, 0)), 5);
        // Friday same week: two weekdays burned, due today
        assert_eq!(remaining_days(requested, 2, pacific(2025, 1, 17, 10, 0)), 0);
        // Following Monday with a two-day limit: one weekday overdue
        assert_eq!(remaining_days(requested, 2, pacific(2025, 1, 20, 10, 0)), -1);
    }

    #[test]
    fn test_record_vote_requires_requested_on() {
        let mut gate = sample_gate(1);
        assert!(!record_vote(&mut gate, &[vote_at(1_000)]));
        assert_eq!(gate.responded_on, None);
    }

    #[test]
    fn test_record_vote_takes_latest_qualifying_vote() {
        let mut gate = sample_gate(1);
        gate.requested_on = Some(1_000);

        // Votes at or before the request don't count as a response
        let stale = [vote_at(900), vote_at(1_000)];
        assert!(!record_vote(&mut gate, &stale));
        assert_eq!(gate.responded_on, None);

        let log = [vote_at(900), vote_at(1_200), vote_at(1_500)];
        assert!(record_vote(&mut gate, &log));
        assert_eq!(gate.responded_on, Some(1_500));
    }

    #[test]
    fn test_record_vote_is_one_shot() {
        let mut gate = sample_gate(1);
        gate.requested_on = Some(1_000);
        gate.responded_on = Some(1_200);

        assert!(!record_vote(&mut gate, &[vote_at(9_999)]));
        assert_eq!(gate.responded_on, Some(1_200));
    }

    #[test]
    fn test_record_comment_requires_approver() {
        let feature = sample_feature();
        let now = pacific(2025, 1, 16, 10, 0);
        let approvers = vec!["privacy-reviewer@example.com".to_string()];

        let mut gate = sample_gate(1);
        gate.requested_on = Some(1_000);

        // Feature owner commenting doesn't stop the clock
        assert!(!record_comment(
            &feature,
            &mut gate,
            "owner@example.com",
            &approvers,
            now
        ));
        assert_eq!(gate.responded_on, None);

        assert!(record_comment(
            &feature,
            &mut gate,
            "privacy-reviewer@example.com",
            &approvers,
            now
        ));
        assert_eq!(gate.responded_on, Some(now.timestamp()));

        // One-shot from here on
        assert!(!record_comment(
            &feature,
            &mut gate,
            "privacy-reviewer@example.com",
            &approvers,
            now
        ));
        assert_eq!(gate.responded_on, Some(now.timestamp()));
    }

    #[test]
    fn test_record_comment_requires_requested_on() {
        let feature = sample_feature();
        let approvers = vec!["reviewer@example.com".to_string()];
        let mut gate = sample_gate(1);

        assert!(!record_comment(
            &feature,
            &mut gate,
            "reviewer@example.com",
            &approvers,
            pacific(2025, 1, 16, 10, 0)
        ));
        assert_eq!(gate.responded_on, None);
    }

    #[test]
    fn test_is_gate_overdue() {
        static TIGHT_RULES: &[ApprovalRule] = &[ApprovalRule {
            gate_type: 1,
            name: "Test Review",
            team_name: "Test",
            rule: Rule::OneLgtm,
            escalation_email: "test@example.com",
            slo_initial_response: 2,
        }];

        let requested = pacific(2025, 1, 15, 10, 0); // Wednesday
        let mut gate = sample_gate(1);

        // Never requested: not overdue
        assert!(!is_gate_overdue(
            &gate,
            TIGHT_RULES,
            DEFAULT_SLO_LIMIT,
            pacific(2025, 2, 20, 10, 0)
        ));

        gate.requested_on = Some(requested.timestamp());

        // Friday: due today but not yet overdue
        assert!(!is_gate_overdue(
            &gate,
            TIGHT_RULES,
            DEFAULT_SLO_LIMIT,
            pacific(2025, 1, 17, 10, 0)
        ));
        // Following Monday: one weekday over
        assert!(is_gate_overdue(
            &gate,
            TIGHT_RULES,
            DEFAULT_SLO_LIMIT,
            pacific(2025, 1, 20, 10, 0)
        ));

        // A responded gate is never overdue, no matter how late
        gate.responded_on = Some(pacific(2025, 1, 16, 9, 0).timestamp());
        assert!(!is_gate_overdue(
            &gate,
            TIGHT_RULES,
            DEFAULT_SLO_LIMIT,
            pacific(2030, 1, 1, 10, 0)
        ));
    }

    #[test]
    fn test_is_gate_overdue_unknown_type_uses_default() {
        let mut gate = sample_gate(999);
        gate.requested_on = Some(pacific(2025, 1, 13, 9, 0).timestamp()); // Monday

        // Default limit is five weekdays: the next Monday is due day five,
        // Tuesday is overdue
        assert!(!is_gate_overdue(
            &gate,
            APPROVAL_RULES,
            DEFAULT_SLO_LIMIT,
            pacific(2025, 1, 20, 9, 0)
        ));
        assert!(is_gate_overdue(
            &gate,
            APPROVAL_RULES,
            DEFAULT_SLO_LIMIT,
            pacific(2025, 1, 21, 9, 0)
        ));
    }

    #[test]
    fn test_filter_overdue_skips_resolved_and_on_time() {
        let now = pacific(2025, 1, 28, 10, 0);
        let requested_long_ago = pacific(2025, 1, 6, 10, 0).timestamp();

        let mut overdue = sample_gate(1);
        overdue.id = 1;
        overdue.requested_on = Some(requested_long_ago);

        let mut on_time = sample_gate(1);
        on_time.id = 2;
        on_time.requested_on = Some(pacific(2025, 1, 27, 10, 0).timestamp());

        let mut responded = sample_gate(1);
        responded.id = 3;
        responded.requested_on = Some(requested_long_ago);
        responded.responded_on = Some(requested_long_ago + 3_600);

        let mut resolved = sample_gate(1);
        resolved.id = 4;
        resolved.state = "approved".to_string();
        resolved.requested_on = Some(requested_long_ago);

        let gates = vec![overdue, on_time, responded, resolved];
        let flagged = filter_overdue(&gates, APPROVAL_RULES, DEFAULT_SLO_LIMIT, now);

        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, 1);
    }
}
