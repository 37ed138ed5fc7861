//! Executor-facing execution contract.
//!
//! A phase executor is an opaque, long-running collaborator: the engine
//! hands it a plan id and a phase id, the executor mutates the plan through
//! the store and reports progress as log lines. The engine never inspects
//! what the executor does beyond its log output and terminal result.

use crate::phase::PhaseId;
use async_trait::async_trait;
use coursegen_model::PlanId;
use tokio::sync::watch;

/// Sink for log lines emitted during phase execution.
///
/// Appends are totally ordered and never lost for the lifetime of the run;
/// the engine-side implementation feeds the run's replayable log stream.
pub trait LogSink: Send + Sync {
    /// Append one log line in arrival order.
    fn append(&self, line: &str);
}

/// Cooperative abort signal handed to executors.
///
/// Abort is best-effort: an executor may poll [`is_aborted`](Self::is_aborted),
/// await [`aborted`](Self::aborted), or ignore the signal entirely and run to
/// natural completion.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

/// Engine-side handle that raises the abort signal.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

/// Create a connected abort handle/signal pair.
#[must_use]
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

impl AbortSignal {
    /// Whether an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once an abort is requested.
    ///
    /// Never resolves if the handle is dropped without aborting, which makes
    /// this safe to race in a `select!` against normal completion.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without aborting: nothing will ever fire.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl AbortHandle {
    /// Request a best-effort abort of the running phase.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether abort has already been requested through this handle.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Errors surfaced by phase executors.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The phase ran and failed; `detail` carries the executor's own
    /// diagnostic text verbatim.
    #[error("phase '{phase}' failed: {detail}")]
    Failed { phase: PhaseId, detail: String },

    /// The executor honored an abort request before completing.
    #[error("phase '{phase}' aborted before completion")]
    Aborted { phase: PhaseId },

    /// The executor could not be started at all.
    #[error("failed to start executor for phase '{phase}': {reason}")]
    Spawn { phase: PhaseId, reason: String },
}

impl ExecutorError {
    /// The phase this error belongs to.
    #[must_use]
    pub const fn phase(&self) -> PhaseId {
        match self {
            Self::Failed { phase, .. } | Self::Aborted { phase } | Self::Spawn { phase, .. } => {
                *phase
            }
        }
    }
}

/// Core trait implemented by every phase executor.
///
/// One implementation typically serves all four phases (dispatching on
/// `phase`), but per-phase implementations are equally valid. Implementations
/// must be cancellation-tolerant: the engine may stop awaiting the returned
/// future (timeout) or raise `abort` (cancellation) at any point.
#[async_trait]
pub trait PhaseExecutor: Send + Sync {
    /// Execute one phase against one plan.
    ///
    /// Log lines go to `log` in arrival order. Returning `Ok(())` marks the
    /// phase successful; any error fails the run.
    async fn execute(
        &self,
        plan_id: &PlanId,
        phase: PhaseId,
        log: &dyn LogSink,
        abort: &AbortSignal,
    ) -> Result<(), ExecutorError>;
}
