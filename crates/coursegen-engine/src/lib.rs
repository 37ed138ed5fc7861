//! Repair orchestration engine for coursegen.
//!
//! This crate wires together the plan store, the phase status evaluator, and
//! the per-plan lock table to execute selective repairs: given a set of
//! deficient phases, it re-invokes only those phases — in dependency order,
//! strictly sequentially, under an exclusive per-plan lock — while streaming
//! an append-only, replayable execution log.
//!
//! # Modules
//!
//! - [`engine`] - [`RepairEngine`]: diagnostics and repair entry points
//! - [`run`] - Repair run state machine, handle, and terminal report
//! - [`logs`] - Append-only execution log stream with full replay
//! - [`error`] - Request-time and run-time error taxonomies

pub mod engine;
pub mod error;
pub mod logs;
pub mod run;

pub use engine::{RepairEngine, StallTimeout};
pub use error::{RepairError, RunFailure};
pub use logs::{LogLevel, LogReader, LogRecord, RunLog};
pub use run::{RepairHandle, RunReport, RunStatus};
