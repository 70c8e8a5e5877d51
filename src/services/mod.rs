//! Business logic services.
//!
//! This module contains the review-state engine: the approval-rule
//! configuration, the pure vote-fold and SLO day math, the orchestration
//! that ties them to storage, and the background overdue sweep.
//!
//! Services are designed to be testable without any embedding application.

pub mod approval_defs;
pub mod review_engine;
pub mod review_state;
pub mod slo;
pub mod sweep_engine;

pub use slo::{Clock, SystemClock};
pub use sweep_engine::{OverdueAlert, SweepConfig, SweepEngine, SweepHandle};
