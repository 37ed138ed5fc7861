//! Repair run state machine, handle, and terminal report.

use crate::error::RunFailure;
use crate::logs::{LogReader, RunLog};
use chrono::{DateTime, Utc};
use coursegen_model::PlanId;
use coursegen_phase_api::{AbortHandle, PhaseId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;

/// State machine position of a repair run.
///
/// ```text
/// Pending -> Running -> {Succeeded, Failed}
///    \----------\-----> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Whether this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal summary of one repair run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Target plan.
    pub plan_id: PlanId,
    /// Phases in the order they were (or would have been) executed.
    pub phases: Vec<PhaseId>,
    /// Terminal state: `Succeeded`, `Failed`, or `Cancelled`.
    pub status: RunStatus,
    /// Failure cause when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    /// When the run was accepted.
    pub started_at: DateTime<Utc>,
    /// When the run reached its terminal state.
    pub finished_at: DateTime<Utc>,
}

/// State shared between the engine's run task and every handle.
#[derive(Debug)]
pub(crate) struct RunShared {
    pub(crate) plan_id: PlanId,
    pub(crate) phases: Vec<PhaseId>,
    pub(crate) log: Arc<RunLog>,
    pub(crate) status_tx: watch::Sender<RunStatus>,
    pub(crate) report: OnceLock<RunReport>,
    pub(crate) started_at: DateTime<Utc>,
}

impl RunShared {
    pub(crate) fn new(plan_id: PlanId, phases: Vec<PhaseId>) -> Self {
        let (status_tx, _) = watch::channel(RunStatus::Pending);
        Self {
            plan_id,
            phases,
            log: Arc::new(RunLog::new()),
            status_tx,
            report: OnceLock::new(),
            started_at: Utc::now(),
        }
    }

    /// Publish the terminal state: report first, then the status flip, then
    /// the log close — readers observing the terminal status always find the
    /// report and a finite log.
    pub(crate) fn finish(&self, status: RunStatus, failure: Option<RunFailure>) {
        let report = RunReport {
            plan_id: self.plan_id.clone(),
            phases: self.phases.clone(),
            status,
            failure,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };
        let _ = self.report.set(report);
        // send_replace: the update must land even when no receiver exists
        // yet (handles read the value through the sender side).
        self.status_tx.send_replace(status);
        self.log.close();
    }
}

/// Caller-facing handle for one repair run.
///
/// Handles are cheap to clone; every clone observes the same run.
#[derive(Debug, Clone)]
pub struct RepairHandle {
    shared: Arc<RunShared>,
    abort: Arc<AbortHandle>,
}

impl RepairHandle {
    pub(crate) fn new(shared: Arc<RunShared>, abort: Arc<AbortHandle>) -> Self {
        Self { shared, abort }
    }

    /// The plan this run targets.
    #[must_use]
    pub fn plan_id(&self) -> &PlanId {
        &self.shared.plan_id
    }

    /// Requested phases in execution (dependency) order.
    #[must_use]
    pub fn phases(&self) -> &[PhaseId] {
        &self.shared.phases
    }

    /// Current state machine position.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        *self.shared.status_tx.borrow()
    }

    /// Subscribe to the run's log stream.
    ///
    /// Every subscription replays the full history from the beginning; the
    /// stream is finite once the run reaches a terminal state.
    #[must_use]
    pub fn logs(&self) -> LogReader {
        self.shared.log.reader()
    }

    /// Request a best-effort cancellation.
    ///
    /// The running phase executor receives an abort request it may honor or
    /// ignore; the run reaches `Cancelled` either way. Completed phases are
    /// not rolled back — re-run diagnostics to learn the true plan state.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Await the terminal state and return the run report.
    pub async fn wait(&self) -> RunReport {
        let mut rx = self.shared.status_tx.subscribe();
        loop {
            if rx.borrow().is_terminal() {
                break;
            }
            if rx.changed().await.is_err() {
                // Run task vanished without publishing a terminal state.
                break;
            }
        }
        self.shared
            .report
            .get()
            .cloned()
            .unwrap_or_else(|| RunReport {
                plan_id: self.shared.plan_id.clone(),
                phases: self.shared.phases.clone(),
                status: RunStatus::Failed,
                failure: Some(RunFailure::Internal {
                    reason: "run task terminated without a report".to_string(),
                }),
                started_at: self.shared.started_at,
                finished_at: Utc::now(),
            })
    }
}
