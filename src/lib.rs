//! Local-first review-gate engine for feature launch tracking.
//!
//! Features carry stages (prototype, origin trial, ship, ...), each stage
//! carries the cross-functional review gates that stage needs, and
//! reviewers resolve gates by voting. This crate owns the rules:
//!
//! - A gate's visible state is a materialized fold over its vote log,
//!   recomputed deterministically on every vote.
//! - Approval rules (one LGTM vs. three) come from a static per-team
//!   table; unknown gate types get the documented fallback.
//! - Review teams owe a first response within a weekday SLO measured in
//!   the US/Pacific calendar; a background sweep emits escalation alerts
//!   for gates past their deadline.
//!
//! Storage is a local SQLite file in WAL mode. The embedding application
//! wires the HTTP/UI surface, notifications, and authentication; this
//! crate deliberately knows nothing about them.
//!
//! ```no_run
//! use launch_gates::models::{NewFeature, StageType, VoteState};
//! use launch_gates::services::{review_engine, SystemClock};
//!
//! # async fn demo() -> Result<(), launch_gates::AppError> {
//! let pool = launch_gates::db::initialize(std::path::Path::new("launch-gates.db")).await?;
//! let clock = SystemClock;
//!
//! let feature = review_engine::create_feature(
//!     &pool,
//!     &clock,
//!     &NewFeature {
//!         name: "CSS Nesting".into(),
//!         owner_emails: vec!["owner@example.com".into()],
//!     },
//! )
//! .await?;
//!
//! let (_stage, gates) =
//!     review_engine::create_stage(&pool, &clock, feature.id, StageType::Ship).await?;
//! review_engine::set_vote(
//!     &pool,
//!     &clock,
//!     gates[0].id,
//!     "owner@example.com",
//!     VoteState::ReviewRequested,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use db::pool::DbPool;
pub use error::AppError;
