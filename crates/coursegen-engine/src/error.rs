//! Request-time and run-time error taxonomies.

use coursegen_phase_api::PhaseId;
use coursegen_store::StoreError;
use serde::{Deserialize, Serialize};

/// Synchronous rejections of a repair request.
///
/// None of these variants leaves any partial effect behind: no run is
/// created, no lock stays held, no log stream exists.
#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    #[error("No phases requested")]
    EmptyRequest,

    #[error("Unknown phase '{phase}'")]
    UnknownPhase { phase: String },

    #[error(
        "Phase '{phase}' requires '{dependency}' to be complete, but it is not ({detail})"
    )]
    DependencyUnmet {
        phase: PhaseId,
        dependency: PhaseId,
        detail: String,
    },

    #[error("A repair is already running for plan '{plan_id}' (held for {held_for})")]
    LockHeld { plan_id: String, held_for: String },

    #[error("Plan '{plan_id}' not found")]
    PlanNotFound { plan_id: String },

    #[error("Internal engine error: {reason}")]
    Internal { reason: String },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl RepairError {
    /// Map a store failure, folding the missing-document case into the
    /// request-level taxonomy.
    #[must_use]
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { plan_id } => Self::PlanNotFound { plan_id },
            other => Self::Store(other),
        }
    }
}

/// Why a run reached the `Failed` terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum RunFailure {
    /// The phase executor reported a failure.
    #[error("phase '{phase}' failed: {detail}")]
    Executor { phase: PhaseId, detail: String },

    /// No run progress (no new log record, no executor response) for the
    /// configured stall duration.
    #[error("phase '{phase}' made no progress for {stalled_secs}s")]
    Timeout { phase: PhaseId, stalled_secs: u64 },

    /// The run task could not complete its work (executor task panicked or
    /// was torn down by the runtime).
    #[error("run aborted internally: {reason}")]
    Internal { reason: String },
}
