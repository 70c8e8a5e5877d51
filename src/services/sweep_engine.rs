//! Background sweep for overdue review gates.
//!
//! This module provides the escalation side of the SLO timer:
//! - Scheduled sweeps over all pending gates at a configurable interval
//! - Overdue detection via the weekday SLO math
//! - Alert fan-out over a channel to whatever notification layer the
//!   embedding application wires up

use crate::db::gates;
use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::services::approval_defs::{self, APPROVAL_RULES, DEFAULT_SLO_LIMIT};
use crate::services::slo::{self, Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time;

/// Default sweep interval in seconds (hourly).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// How many unread alerts the channel buffers before the sweep stalls.
const ALERT_CHANNEL_CAPACITY: usize = 64;

/// Sweep engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Sweep interval in seconds.
    pub interval_secs: u64,

    /// SLO limit applied to gates whose type has no configured rule.
    pub default_slo_limit: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            default_slo_limit: DEFAULT_SLO_LIMIT,
        }
    }
}

/// Status of the sweep engine.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepStatus {
    /// Whether a sweep is currently running.
    pub is_sweeping: bool,

    /// Last completed sweep timestamp.
    pub last_sweep_time: Option<i64>,

    /// Last sweep error message.
    pub last_error: Option<String>,

    /// Overdue gates found by the last sweep.
    pub last_overdue_count: i64,

    /// Total sweeps completed since start.
    pub sweeps_completed: i64,
}

/// One overdue gate, ready to hand to a notification collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct OverdueAlert {
    pub gate_id: i64,
    pub feature_id: i64,
    pub gate_type: i64,

    /// Review name from the rule table, or "unknown" for unconfigured
    /// gate types.
    pub gate_name: String,

    /// Owning review team, or "unknown" for unconfigured gate types.
    pub team_name: String,

    /// Where the escalation should go, when the rule table knows.
    pub escalation_email: Option<String>,

    /// When review was requested (Unix seconds).
    pub requested_on: i64,

    /// Whole weekdays past the team's response SLO.
    pub days_overdue: i64,
}

/// Commands that can be sent to the sweep engine.
#[derive(Debug)]
pub enum SweepCommand {
    /// Run a sweep immediately.
    TriggerSweep,

    /// Update the sweep configuration.
    UpdateConfig(SweepConfig),

    /// Stop the sweep engine.
    Stop,
}

/// Lightweight handle for controlling the background sweep.
///
/// Communicates with the background loop via an mpsc channel, avoiding
/// lock contention.
#[derive(Clone)]
pub struct SweepHandle {
    /// Command channel sender.
    command_tx: mpsc::Sender<SweepCommand>,

    /// Shared configuration (readable without locking the engine).
    config: Arc<RwLock<SweepConfig>>,
}

impl SweepHandle {
    /// Run a sweep immediately.
    pub async fn trigger_sweep(&self) -> Result<(), AppError> {
        self.command_tx
            .send(SweepCommand::TriggerSweep)
            .await
            .map_err(|_| AppError::internal("Sweep engine not running"))
    }

    /// Update the sweep configuration.
    pub async fn update_config(&self, config: SweepConfig) -> Result<(), AppError> {
        self.command_tx
            .send(SweepCommand::UpdateConfig(config))
            .await
            .map_err(|_| AppError::internal("Sweep engine not running"))
    }

    /// Stop the sweep engine.
    pub async fn stop(&self) -> Result<(), AppError> {
        self.command_tx
            .send(SweepCommand::Stop)
            .await
            .map_err(|_| AppError::internal("Sweep engine not running"))
    }

    /// Get the current configuration.
    pub async fn get_config(&self) -> SweepConfig {
        self.config.read().await.clone()
    }
}

/// Background sweep engine.
///
/// Walks all pending gates on a timer and emits an [`OverdueAlert`] for
/// each one whose review team has blown its first-response SLO.
pub struct SweepEngine {
    /// Database connection pool.
    pool: DbPool,

    /// Current configuration.
    config: Arc<RwLock<SweepConfig>>,

    /// Sweep status.
    status: Arc<RwLock<SweepStatus>>,

    /// Where overdue alerts are delivered.
    alert_tx: mpsc::Sender<OverdueAlert>,

    /// Time source for deadline checks.
    clock: Arc<dyn Clock>,
}

impl SweepEngine {
    /// Create a sweep engine with an explicit clock and alert sink.
    pub fn new(
        pool: DbPool,
        config: SweepConfig,
        alert_tx: mpsc::Sender<OverdueAlert>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(RwLock::new(config)),
            status: Arc::new(RwLock::new(SweepStatus::default())),
            alert_tx,
            clock,
        }
    }

    /// Get a snapshot of the sweep status.
    pub async fn get_status(&self) -> SweepStatus {
        self.status.read().await.clone()
    }

    /// Start the background sweep loop.
    ///
    /// Spawns a task that owns the engine and sweeps at the configured
    /// interval, starting with an immediate sweep. Returns a handle for
    /// sending commands plus the receiving end of the alert channel; the
    /// caller forwards alerts to its notification layer.
    pub fn start_background(
        pool: DbPool,
        config: SweepConfig,
    ) -> (SweepHandle, mpsc::Receiver<OverdueAlert>) {
        let (command_tx, mut command_rx) = mpsc::channel::<SweepCommand>(16);
        let (alert_tx, alert_rx) = mpsc::channel::<OverdueAlert>(ALERT_CHANNEL_CAPACITY);
        let config_shared = Arc::new(RwLock::new(config.clone()));
        let config_for_task = config_shared.clone();

        tokio::spawn(async move {
            let engine = SweepEngine {
                pool,
                config: config_for_task,
                status: Arc::new(RwLock::new(SweepStatus::default())),
                alert_tx,
                clock: Arc::new(SystemClock),
            };

            eprintln!("[sweep] Running initial overdue sweep...");
            match engine.run_sweep().await {
                Ok(count) => eprintln!("[sweep] Initial sweep complete: {} overdue", count),
                Err(e) => eprintln!("[sweep] Initial sweep error: {}", e),
            }

            let interval_secs = { engine.config.read().await.interval_secs };
            let mut interval = time::interval(Duration::from_secs(interval_secs));
            // Consume the first (immediate) tick since we just swept
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        eprintln!("[sweep] Running periodic overdue sweep...");
                        if let Err(e) = engine.run_sweep().await {
                            eprintln!("[sweep] Periodic sweep error: {}", e);
                        }
                    }
                    Some(cmd) = command_rx.recv() => {
                        match cmd {
                            SweepCommand::TriggerSweep => {
                                eprintln!("[sweep] Manual sweep triggered");
                                if let Err(e) = engine.run_sweep().await {
                                    eprintln!("[sweep] Manual sweep error: {}", e);
                                }
                            }
                            SweepCommand::UpdateConfig(new_config) => {
                                eprintln!(
                                    "[sweep] Config updated, interval={}s",
                                    new_config.interval_secs
                                );
                                interval = time::interval(Duration::from_secs(new_config.interval_secs));
                                *engine.config.write().await = new_config;
                            }
                            SweepCommand::Stop => {
                                eprintln!("[sweep] Sweep engine stopping");
                                break;
                            }
                        }
                    }
                }
            }
            eprintln!("[sweep] Sweep engine stopped");
        });

        (
            SweepHandle {
                command_tx,
                config: config_shared,
            },
            alert_rx,
        )
    }

    /// Run a single sweep: find every pending gate past its SLO and emit
    /// an alert for each.
    ///
    /// # Returns
    /// How many overdue gates were found.
    pub async fn run_sweep(&self) -> Result<u64, AppError> {
        {
            let mut status = self.status.write().await;
            status.is_sweeping = true;
        }

        let now = self.clock.now();
        let default_slo_limit = { self.config.read().await.default_slo_limit };

        let result = self.sweep_once(now, default_slo_limit).await;

        {
            let mut status = self.status.write().await;
            status.is_sweeping = false;
            status.last_sweep_time = Some(now.timestamp());
            match &result {
                Ok(count) => {
                    status.last_overdue_count = *count as i64;
                    status.sweeps_completed += 1;
                    status.last_error = None;
                }
                Err(e) => {
                    status.last_error = Some(e.to_string());
                }
            }
        }

        result
    }

    async fn sweep_once(&self, now: DateTime<Utc>, default_slo_limit: i64) -> Result<u64, AppError> {
        let pending = gates::list_pending_gates(&self.pool).await?;
        let overdue = slo::filter_overdue(&pending, APPROVAL_RULES, default_slo_limit, now);
        let count = overdue.len() as u64;

        for gate in overdue {
            let rule = approval_defs::rule_for_gate_type(APPROVAL_RULES, gate.gate_type);
            let limit =
                approval_defs::slo_limit_for(APPROVAL_RULES, gate.gate_type, default_slo_limit);
            let requested_on = gate.requested_on.unwrap_or(0);
            let days_overdue = DateTime::from_timestamp(requested_on, 0)
                .map(|requested| -slo::remaining_days(requested, limit, now))
                .unwrap_or(0);

            let alert = OverdueAlert {
                gate_id: gate.id,
                feature_id: gate.feature_id,
                gate_type: gate.gate_type,
                gate_name: rule
                    .map(|r| r.name.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                team_name: rule
                    .map(|r| r.team_name.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                escalation_email: rule.map(|r| r.escalation_email.to_string()),
                requested_on,
                days_overdue,
            };

            if self.alert_tx.send(alert).await.is_err() {
                eprintln!("[sweep] Alert receiver dropped; discarding remaining alerts");
                break;
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{NewFeature, StageType, VoteState};
    use crate::services::review_engine;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::tempdir;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    async fn setup_test_db() -> DbPool {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = db::initialize(&db_path).await.unwrap();
        std::mem::forget(dir);
        pool
    }

    #[tokio::test]
    async fn test_run_sweep_emits_alert_per_overdue_gate() {
        let pool = setup_test_db().await;
        let clock = at(2025, 1, 6, 9);
        let feature = review_engine::create_feature(
            &pool,
            &clock,
            &NewFeature {
                name: "Shared Storage".to_string(),
                owner_emails: vec!["owner@example.com".to_string()],
            },
        )
        .await
        .unwrap();
        let (_stage, stage_gates) =
            review_engine::create_stage(&pool, &clock, feature.id, StageType::Ship)
                .await
                .unwrap();

        // One gate asked long ago, one just now
        let stale = &stage_gates[0];
        let fresh = &stage_gates[1];
        review_engine::set_vote(
            &pool,
            &at(2025, 1, 6, 10),
            stale.id,
            "owner@example.com",
            VoteState::ReviewRequested,
        )
        .await
        .unwrap();
        review_engine::set_vote(
            &pool,
            &at(2025, 1, 27, 10),
            fresh.id,
            "owner@example.com",
            VoteState::ReviewRequested,
        )
        .await
        .unwrap();

        let (alert_tx, mut alert_rx) = mpsc::channel(8);
        let engine = SweepEngine::new(
            pool,
            SweepConfig::default(),
            alert_tx,
            Arc::new(at(2025, 1, 28, 10)),
        );

        let count = engine.run_sweep().await.unwrap();
        assert_eq!(count, 1);

        let alert = alert_rx.try_recv().unwrap();
        assert_eq!(alert.gate_id, stale.id);
        assert_eq!(alert.feature_id, feature.id);
        assert_eq!(alert.gate_name, "Intent to Ship");
        assert!(alert.days_overdue > 0);
        assert!(alert.escalation_email.is_some());
        assert!(alert_rx.try_recv().is_err());

        let status = engine.get_status().await;
        assert!(!status.is_sweeping);
        assert_eq!(status.last_overdue_count, 1);
        assert_eq!(status.sweeps_completed, 1);
        assert!(status.last_sweep_time.is_some());
    }

    #[tokio::test]
    async fn test_run_sweep_with_nothing_pending() {
        let pool = setup_test_db().await;

        let (alert_tx, mut alert_rx) = mpsc::channel(8);
        let engine = SweepEngine::new(
            pool,
            SweepConfig::default(),
            alert_tx,
            Arc::new(at(2025, 1, 28, 10)),
        );

        let count = engine.run_sweep().await.unwrap();
        assert_eq!(count, 0);
        assert!(alert_rx.try_recv().is_err());

        let status = engine.get_status().await;
        assert_eq!(status.last_overdue_count, 0);
        assert_eq!(status.last_error, None);
    }
}
