//! Per-plan repair locking for coursegen.
//!
//! This crate provides exclusive repair locking per plan ID to prevent
//! concurrent repair runs against the same artifact. Acquisition is a single
//! compare-and-acquire under one table mutex, so two racing requests can
//! never both succeed; release is tied to guard drop so every exit path
//! (success, failure, cancellation, timeout, panic unwind) gives the lock
//! back.
//!
//! The table is in-process state: the engine's deployment unit is a single
//! process and the orchestrator is the only writer.

use chrono::{DateTime, Utc};
use coursegen_model::PlanId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Information recorded for a held lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Monotonic token identifying the acquisition, unique per table.
    pub token: u64,
    /// Timestamp when the lock was acquired.
    pub acquired_at: DateTime<Utc>,
}

/// Lock errors for repair lock operations.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Concurrent repair detected for plan '{plan_id}' (held for {held_for})")]
    Held { plan_id: String, held_for: String },

    #[error("Failed to acquire lock: {reason}")]
    AcquisitionFailed { reason: String },
}

#[derive(Debug, Default)]
struct TableState {
    holders: HashMap<PlanId, LockInfo>,
    next_token: u64,
}

/// Process-wide repair lock table keyed by plan ID.
///
/// Cloning the table clones a handle to the same shared state.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    state: Arc<Mutex<TableState>>,
}

/// Guard for a held repair lock.
///
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct LockGuard {
    state: Arc<Mutex<TableState>>,
    plan_id: PlanId,
    token: u64,
}

impl LockTable {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to acquire the exclusive repair lock for `plan_id`.
    ///
    /// This is atomic with respect to every other acquisition on the same
    /// table: the existence check and the insert happen under one mutex
    /// critical section.
    ///
    /// # Errors
    /// * [`LockError::Held`] - another non-terminal run holds the lock
    /// * [`LockError::AcquisitionFailed`] - the table mutex was poisoned
    pub fn try_acquire(&self, plan_id: &PlanId) -> Result<LockGuard, LockError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| LockError::AcquisitionFailed {
                reason: format!("lock table poisoned: {e}"),
            })?;

        if let Some(existing) = state.holders.get(plan_id) {
            return Err(LockError::Held {
                plan_id: plan_id.to_string(),
                held_for: format_duration_since(existing.acquired_at),
            });
        }

        state.next_token += 1;
        let token = state.next_token;
        state.holders.insert(
            plan_id.clone(),
            LockInfo {
                token,
                acquired_at: Utc::now(),
            },
        );

        Ok(LockGuard {
            state: Arc::clone(&self.state),
            plan_id: plan_id.clone(),
            token,
        })
    }

    /// Whether a lock is currently held for `plan_id`.
    #[must_use]
    pub fn is_held(&self, plan_id: &PlanId) -> bool {
        self.state
            .lock()
            .map(|state| state.holders.contains_key(plan_id))
            .unwrap_or(false)
    }

    /// Information about the current holder, if any.
    #[must_use]
    pub fn holder(&self, plan_id: &PlanId) -> Option<LockInfo> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.holders.get(plan_id).cloned())
    }
}

impl LockGuard {
    /// The plan this guard locks.
    #[must_use]
    pub fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            // Only remove the entry this guard created; a stale guard must
            // not release a successor's lock.
            if state
                .holders
                .get(&self.plan_id)
                .is_some_and(|info| info.token == self.token)
            {
                state.holders.remove(&self.plan_id);
            }
        }
    }
}

/// Format a duration since a timestamp in a human-readable way.
fn format_duration_since(acquired_at: DateTime<Utc>) -> String {
    let secs = (Utc::now() - acquired_at).num_seconds().max(0) as u64;
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}
