//! Activity model: comments on a feature or one of its gates.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A comment left on a feature, optionally scoped to a gate.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    /// Local activity ID.
    pub id: i64,

    /// Feature the comment belongs to.
    pub feature_id: i64,

    /// Gate the comment is scoped to, if any.
    pub gate_id: Option<i64>,

    /// Author identity (e-mail).
    pub author: String,

    /// Comment body.
    pub content: String,

    /// When the comment was posted (Unix seconds).
    pub created_at: i64,
}

impl Activity {
    /// Whether this comment sits on a gate review thread rather than the
    /// feature's general discussion.
    pub fn is_gate_comment(&self) -> bool {
        self.gate_id.is_some()
    }
}
