//! Feature and stage models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tracked feature entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feature {
    /// Local feature ID.
    pub id: i64,

    /// Feature name as shown to reviewers.
    pub name: String,

    /// Feature owners, as a JSON array of e-mails.
    #[sqlx(default)]
    pub owner_emails: String,

    /// When the feature row was created (Unix seconds).
    pub created_at: i64,

    /// When the feature row was last modified (Unix seconds).
    pub updated_at: i64,
}

impl Feature {
    /// Parse the owner JSON array into a vector of e-mails.
    pub fn owner_emails_vec(&self) -> Vec<String> {
        serde_json::from_str(&self.owner_emails).unwrap_or_default()
    }
}

/// Input for creating a feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFeature {
    pub name: String,
    pub owner_emails: Vec<String>,
}

/// Shipping stage of a feature's lifecycle.
///
/// Creating a stage spawns the review gates that stage type requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    Prototype,
    DevTrial,
    OriginTrial,
    ExtendOriginTrial,
    Ship,
}

/// Unrecognized stored values read as the earliest stage.
impl From<&str> for StageType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev_trial" => Self::DevTrial,
            "origin_trial" => Self::OriginTrial,
            "extend_origin_trial" => Self::ExtendOriginTrial,
            "ship" => Self::Ship,
            _ => Self::Prototype,
        }
    }
}

impl std::fmt::Display for StageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prototype => write!(f, "prototype"),
            Self::DevTrial => write!(f, "dev_trial"),
            Self::OriginTrial => write!(f, "origin_trial"),
            Self::ExtendOriginTrial => write!(f, "extend_origin_trial"),
            Self::Ship => write!(f, "ship"),
        }
    }
}

/// One stage row attached to a feature.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stage {
    /// Local stage ID.
    pub id: i64,

    /// Feature this stage belongs to.
    pub feature_id: i64,

    /// Stage type: `prototype`, `dev_trial`, `origin_trial`,
    /// `extend_origin_trial`, `ship`.
    pub stage_type: String,

    /// When the stage row was created (Unix seconds).
    pub created_at: i64,
}

impl Stage {
    /// Parse the stage type string into an enum.
    pub fn stage_type_enum(&self) -> StageType {
        StageType::from(self.stage_type.as_str())
    }
}
