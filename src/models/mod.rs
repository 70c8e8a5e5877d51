//! Data models for features, stages, gates, votes, and activities.

pub mod activity;
pub mod feature;
pub mod gate;
pub mod vote;

pub use activity::Activity;
pub use feature::{Feature, NewFeature, Stage, StageType};
pub use gate::{Gate, GateState};
pub use vote::{Vote, VoteState};
