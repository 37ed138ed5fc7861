//! coursegen - Pipeline diagnostics and selective repair for generated curricula
//!
//! coursegen inspects a partially-built curriculum plan to determine, per
//! pipeline phase, whether that phase's output is complete, missing, or
//! degraded, and re-invokes only the deficient phases — without disturbing
//! already-complete work — while streaming progress and guaranteeing that no
//! two repair runs for the same plan execute concurrently.
//!
//! # Architecture
//!
//! The workspace is split into small single-purpose crates, re-exported here
//! under stable module names:
//!
//! - [`model`] - the plan/module/lesson document model
//! - [`phase_api`] - the shared phase and executor contract
//! - [`status`] - the pure phase status evaluator
//! - [`lock`] - the per-plan repair lock table
//! - [`store`] - plan document storage (JSON files or in-memory)
//! - [`runner`] - the process-backed phase executor
//! - [`config`] - configuration model and discovery
//! - [`engine`] - the repair orchestrator and execution log stream
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use coursegen::{PhaseId, RepairEngine};
//! use coursegen::store::MemoryStore;
//! use coursegen::phase_api::PhaseExecutor;
//!
//! # async fn demo(executor: Arc<dyn PhaseExecutor>) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RepairEngine::new(Arc::new(MemoryStore::new()), executor);
//!
//! let plan_id = "onboarding-2026".parse()?;
//! let diagnostics = engine.diagnostics(&plan_id)?;
//! let deficient: Vec<PhaseId> = diagnostics
//!     .iter()
//!     .filter(|s| s.state == coursegen::PhaseState::Warning)
//!     .map(|s| s.phase)
//!     .collect();
//!
//! let handle = engine.request_repair(&plan_id, &deficient)?;
//! let report = handle.wait().await;
//! println!("repair finished: {}", report.status);
//! # Ok(())
//! # }
//! ```

// Re-export shared crates under stable module names.
pub use coursegen_config as config;
pub use coursegen_engine as engine;
pub use coursegen_lock as lock;
pub use coursegen_model as model;
pub use coursegen_phase_api as phase_api;
pub use coursegen_runner as runner;
pub use coursegen_status as status;
pub use coursegen_store as store;

pub mod cli;
pub mod exit_codes;
pub mod logging;

// Primary public types at the crate root.
pub use coursegen_engine::{
    LogLevel, LogReader, LogRecord, RepairEngine, RepairError, RepairHandle, RunFailure,
    RunReport, RunStatus, StallTimeout,
};
pub use coursegen_model::{CoursePlan, Lesson, Module, PlanId};
pub use coursegen_phase_api::{PhaseExecutor, PhaseId, PhaseState, PhaseStatus};
pub use exit_codes::ExitCode;
