//! The store trait and the in-memory implementation.

use coursegen_model::{CoursePlan, PlanId};
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

/// Errors surfaced by plan stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Plan '{plan_id}' not found")]
    NotFound { plan_id: String },

    #[error("IO error accessing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Plan document at '{path}' is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Storage contract for plan documents.
///
/// Implementations must be safe to share across tasks; the engine holds the
/// store behind an `Arc` and reads snapshots while executors write new
/// versions. `load` returns a detached snapshot — later writes never mutate
/// a previously loaded value.
pub trait ArtifactStore: Send + Sync {
    /// Load the current snapshot of a plan.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when no document exists for the ID.
    fn load(&self, plan_id: &PlanId) -> Result<CoursePlan, StoreError>;

    /// Persist a new plan version, replacing any previous one.
    fn save(&self, plan: &CoursePlan) -> Result<(), StoreError>;

    /// Whether a document exists for the ID.
    fn exists(&self, plan_id: &PlanId) -> bool;
}

/// In-memory store for tests, demos, and embedded use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    plans: Mutex<HashMap<PlanId, CoursePlan>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a plan (convenience for test setup).
    pub fn with_plan(plan: CoursePlan) -> Self {
        let store = Self::new();
        store
            .save(&plan)
            .expect("in-memory save is infallible");
        store
    }
}

impl ArtifactStore for MemoryStore {
    fn load(&self, plan_id: &PlanId) -> Result<CoursePlan, StoreError> {
        self.plans
            .lock()
            .expect("memory store mutex")
            .get(plan_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                plan_id: plan_id.to_string(),
            })
    }

    fn save(&self, plan: &CoursePlan) -> Result<(), StoreError> {
        self.plans
            .lock()
            .expect("memory store mutex")
            .insert(plan.id.clone(), plan.clone());
        Ok(())
    }

    fn exists(&self, plan_id: &PlanId) -> bool {
        self.plans
            .lock()
            .expect("memory store mutex")
            .contains_key(plan_id)
    }
}
