//! Process-backed phase executor for coursegen.
//!
//! Generation phases are opaque long-running jobs. This crate adapts them as
//! external commands: one configured command template per phase, spawned
//! argv-style (no shell string evaluation), with child stdout streamed line
//! by line into the run's log stream and a bounded stderr tail folded into
//! the failure detail on non-zero exit.
//!
//! # Modules
//!
//! - [`command_spec`] - Argv-style command specification
//! - [`process`] - The [`ProcessExecutor`] implementation

pub mod command_spec;
pub mod process;

pub use command_spec::CommandSpec;
pub use process::ProcessExecutor;
