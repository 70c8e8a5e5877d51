//! Gate model: one required review on a feature's stage.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Aggregate review state of a gate.
///
/// `Preparing` is the initial value before any review has been requested;
/// every other value is derived from the gate's vote log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Preparing,
    ReviewRequested,
    ReviewStarted,
    NeedsWork,
    InternalReview,
    Approved,
    Denied,
    Na,
}

impl GateState {
    /// States in which the review team still owes the feature team a
    /// response.
    pub const PENDING: [GateState; 4] = [
        GateState::ReviewRequested,
        GateState::ReviewStarted,
        GateState::NeedsWork,
        GateState::InternalReview,
    ];

    /// Terminal states: the review has reached an outcome.
    pub const RESOLVED: [GateState; 3] =
        [GateState::Approved, GateState::Denied, GateState::Na];

    /// Whether a review is underway and unresolved.
    pub fn is_pending(&self) -> bool {
        Self::PENDING.contains(self)
    }

    /// Whether the review has reached an outcome.
    pub fn is_resolved(&self) -> bool {
        Self::RESOLVED.contains(self)
    }

    /// Whether the gate no longer needs further approvals.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Approved | Self::Na)
    }
}

/// Lenient conversion for stored rows: unrecognized values are treated as
/// `Preparing` so a corrupted row reads as "nothing requested yet".
impl From<&str> for GateState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "review_requested" => Self::ReviewRequested,
            "review_started" => Self::ReviewStarted,
            "needs_work" => Self::NeedsWork,
            "internal_review" => Self::InternalReview,
            "approved" => Self::Approved,
            "denied" => Self::Denied,
            "na" => Self::Na,
            _ => Self::Preparing,
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preparing => write!(f, "preparing"),
            Self::ReviewRequested => write!(f, "review_requested"),
            Self::ReviewStarted => write!(f, "review_started"),
            Self::NeedsWork => write!(f, "needs_work"),
            Self::InternalReview => write!(f, "internal_review"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
            Self::Na => write!(f, "na"),
        }
    }
}

/// A single review gate attached to a feature's stage.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gate {
    /// Local gate ID.
    pub id: i64,

    /// Feature this gate belongs to.
    pub feature_id: i64,

    /// Stage this gate blocks.
    pub stage_id: i64,

    /// Review-rule type; see `services::approval_defs`.
    pub gate_type: i64,

    /// Aggregate state: `preparing`, `review_requested`, `review_started`,
    /// `needs_work`, `internal_review`, `approved`, `denied`, `na`.
    pub state: String,

    /// When review was first requested (Unix seconds). Set once; later
    /// re-requests do not move it.
    pub requested_on: Option<i64>,

    /// When a reviewer first responded after the request (Unix seconds).
    /// Set once per request cycle.
    pub responded_on: Option<i64>,

    /// Reviewers assigned to this gate, as a JSON array of e-mails.
    #[sqlx(default)]
    pub assignee_emails: String,

    /// Short note from the review team about what happens next.
    pub next_action: Option<String>,

    /// Whether the review team flagged this gate for an extra round of
    /// review after resolution.
    #[sqlx(default)]
    pub additional_review: bool,

    /// When the gate row was created (Unix seconds).
    pub created_at: i64,

    /// When the gate row was last modified (Unix seconds).
    pub updated_at: i64,
}

impl Gate {
    /// Parse the state string into an enum.
    pub fn state_enum(&self) -> GateState {
        GateState::from(self.state.as_str())
    }

    /// Parse the assignee JSON array into a vector of e-mails.
    pub fn assignee_emails_vec(&self) -> Vec<String> {
        serde_json::from_str(&self.assignee_emails).unwrap_or_default()
    }

    /// Whether the review team currently owes a first response: review was
    /// requested and nobody has responded yet.
    pub fn awaiting_response(&self) -> bool {
        self.requested_on.is_some() && self.responded_on.is_none()
    }
}
