//! Shared contract between the repair orchestrator and phase executors.
//!
//! This crate provides the types both sides of the engine agree on: phase
//! identifiers and their static definitions, the computed per-phase status
//! verdicts, and the executor-facing execution contract (log sink, abort
//! signal, error taxonomy).
//!
//! # Purpose
//!
//! Keeping the contract in its own crate lets the evaluator, the lock table,
//! the orchestrator, and executor implementations depend on one small surface
//! without introducing circular dependencies.

pub mod executor;
pub mod phase;

pub use executor::{AbortHandle, AbortSignal, ExecutorError, LogSink, PhaseExecutor, abort_pair};
pub use phase::{PhaseDefinition, PhaseId, PhaseState, PhaseStatus, UnknownPhase};
