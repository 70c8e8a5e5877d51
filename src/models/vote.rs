//! Vote model: one reviewer's recorded position on a gate.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// State a reviewer can set on a gate.
///
/// `NoResponse` is the cleared/neutral value; it never contributes to the
/// aggregate gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    NoResponse,
    Na,
    ReviewRequested,
    ReviewStarted,
    NeedsWork,
    Approved,
    Denied,
    InternalReview,
}

impl VoteState {
    /// All states a caller may legitimately submit.
    pub const ALL: [VoteState; 8] = [
        VoteState::NoResponse,
        VoteState::Na,
        VoteState::ReviewRequested,
        VoteState::ReviewStarted,
        VoteState::NeedsWork,
        VoteState::Approved,
        VoteState::Denied,
        VoteState::InternalReview,
    ];

    /// Whether this vote fully satisfies a gate on its own, regardless of
    /// how many approvals the gate's rule requires.
    pub fn is_full_satisfaction(&self) -> bool {
        matches!(self, Self::Na)
    }
}

/// Lenient conversion used when reading stored rows: unrecognized values
/// become `NoResponse`, which the aggregate calculator ignores.
impl From<&str> for VoteState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "na" => Self::Na,
            "review_requested" => Self::ReviewRequested,
            "review_started" => Self::ReviewStarted,
            "needs_work" => Self::NeedsWork,
            "approved" => Self::Approved,
            "denied" => Self::Denied,
            "internal_review" => Self::InternalReview,
            _ => Self::NoResponse,
        }
    }
}

/// Strict parse used at input boundaries: unknown values are rejected so a
/// bad request never reaches the vote log.
impl std::str::FromStr for VoteState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no_response" => Ok(Self::NoResponse),
            "na" => Ok(Self::Na),
            "review_requested" => Ok(Self::ReviewRequested),
            "review_started" => Ok(Self::ReviewStarted),
            "needs_work" => Ok(Self::NeedsWork),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            "internal_review" => Ok(Self::InternalReview),
            other => Err(AppError::invalid_input_field(
                format!("unknown vote state: {}", other),
                "state",
            )),
        }
    }
}

impl std::fmt::Display for VoteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoResponse => write!(f, "no_response"),
            Self::Na => write!(f, "na"),
            Self::ReviewRequested => write!(f, "review_requested"),
            Self::ReviewStarted => write!(f, "review_started"),
            Self::NeedsWork => write!(f, "needs_work"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
            Self::InternalReview => write!(f, "internal_review"),
        }
    }
}

/// One reviewer's vote on a gate at a point in time.
///
/// The vote log keeps one row per (gate, reviewer): saving a vote for a
/// reviewer who already voted supersedes their previous row. Historical
/// duplicates are tolerated by the aggregate calculator, so the table
/// carries no uniqueness constraint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vote {
    /// Local vote ID.
    pub id: i64,

    /// Feature this vote belongs to (denormalized from the gate).
    pub feature_id: i64,

    /// Gate this vote applies to.
    pub gate_id: i64,

    /// Review-rule type of the gate (denormalized copy).
    pub gate_type: i64,

    /// Vote state: `na`, `review_requested`, `review_started`,
    /// `needs_work`, `approved`, `denied`, `internal_review`,
    /// `no_response`.
    pub state: String,

    /// When the vote was cast (Unix seconds).
    pub set_on: i64,

    /// Reviewer identity (e-mail).
    pub set_by: String,
}

impl Vote {
    /// Parse the state string into an enum.
    pub fn state_enum(&self) -> VoteState {
        VoteState::from(self.state.as_str())
    }

    /// Check if this vote counts toward an approval threshold.
    pub fn is_approval(&self) -> bool {
        self.state_enum() == VoteState::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_str_lenient() {
        assert_eq!(VoteState::from("approved"), VoteState::Approved);
        assert_eq!(VoteState::from("DENIED"), VoteState::Denied);
        assert_eq!(VoteState::from("Needs_Work"), VoteState::NeedsWork);
        // Unknown values fall back to the inert state.
        assert_eq!(VoteState::from("garbage"), VoteState::NoResponse);
        assert_eq!(VoteState::from(""), VoteState::NoResponse);
    }

    #[test]
    fn test_state_parse_strict() {
        assert_eq!(
            "internal_review".parse::<VoteState>().unwrap(),
            VoteState::InternalReview
        );
        assert!("garbage".parse::<VoteState>().is_err());
        assert!("preparing".parse::<VoteState>().is_err());
    }

    #[test]
    fn test_state_display_round_trip() {
        for state in VoteState::ALL {
            assert_eq!(VoteState::from(state.to_string().as_str()), state);
        }
    }

    #[test]
    fn test_is_approval() {
        let vote = Vote {
            id: 1,
            feature_id: 1,
            gate_id: 1,
            gate_type: 1,
            state: "approved".to_string(),
            set_on: 0,
            set_by: "reviewer@example.com".to_string(),
        };
        assert!(vote.is_approval());
        assert!(VoteState::Na.is_full_satisfaction());
        assert!(!VoteState::Approved.is_full_satisfaction());
    }
}
