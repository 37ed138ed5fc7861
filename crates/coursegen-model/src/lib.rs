//! Curriculum plan document model for coursegen.
//!
//! This crate defines the typed representation of a curriculum plan as
//! produced by the generation pipeline: a plan owns an ordered sequence of
//! modules, each module owns an ordered sequence of lessons, and lessons
//! carry optional enrichment fields (voiceover script, quiz).
//!
//! The model is a read-only surface for the diagnostics engine. Mutation
//! happens in the external phase executors; the evaluator and orchestrator
//! only ever inspect a loaded snapshot.
//!
//! # Modules
//!
//! - [`id`] - Plan identifier validation
//! - [`plan`] - Plan, module, lesson, and quiz document types

pub mod id;
pub mod plan;

pub use id::{PlanId, PlanIdError};
pub use plan::{CoursePlan, Lesson, Module, Quiz, QuizQuestion};
