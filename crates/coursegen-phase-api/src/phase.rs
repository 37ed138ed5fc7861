//! Phase identifiers, definitions, and computed status verdicts.

use coursegen_model::CoursePlan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase identifiers for the curriculum generation pipeline.
///
/// Phases execute in a defined order with dependencies between them.
///
/// # Phase Order
///
/// ```text
/// ContextIndexing → MasterPlan → LessonGeneration → Enrichment
/// ```
///
/// # Dependencies
///
/// - `ContextIndexing`: no dependencies (shared corpus ingestion)
/// - `MasterPlan`: no dependencies (indexing never reports `Complete`, so it
///   cannot gate anything — see [`PhaseState::Ready`])
/// - `LessonGeneration`: requires `MasterPlan` to be `Complete`
/// - `Enrichment`: requires `MasterPlan` to be `Complete`
///
/// # Example
///
/// ```rust
/// use coursegen_phase_api::PhaseId;
///
/// let phase = PhaseId::MasterPlan;
/// assert_eq!(phase.as_str(), "master_plan");
/// assert!(PhaseId::ContextIndexing < PhaseId::Enrichment);
/// ```
///
/// # Serialization
///
/// `PhaseId` serializes to its string token (e.g. `"master_plan"`), which is
/// also the token accepted on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    /// Corpus ingestion and indexing of the uploaded source material.
    ContextIndexing,
    /// Synthesis of the module-level course outline.
    MasterPlan,
    /// Expansion of each module into lessons.
    LessonGeneration,
    /// Per-lesson enrichment: voiceover scripts and quizzes.
    Enrichment,
}

/// Parse error for unrecognized phase tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown phase '{token}'")]
pub struct UnknownPhase {
    pub token: String,
}

impl PhaseId {
    /// All phases in pipeline order.
    pub const ALL: [Self; 4] = [
        Self::ContextIndexing,
        Self::MasterPlan,
        Self::LessonGeneration,
        Self::Enrichment,
    ];

    /// The stable string token for this phase.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ContextIndexing => "context_indexing",
            Self::MasterPlan => "master_plan",
            Self::LessonGeneration => "lesson_generation",
            Self::Enrichment => "enrichment",
        }
    }

    /// Human-readable label used in log records and status tables.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ContextIndexing => "Context Indexing",
            Self::MasterPlan => "Master Plan",
            Self::LessonGeneration => "Lesson Generation",
            Self::Enrichment => "Enrichment",
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseId {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPhase {
                token: s.to_string(),
            })
    }
}

/// Completeness verdict for one phase against one plan snapshot.
///
/// `Ready` is reserved for phases with no per-plan incompleteness signal
/// (the shared corpus index): runnable, but never reported `Complete`.
/// `Warning` marks degraded-but-usable output; `Error` marks a hard
/// precondition failure for downstream phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Ready,
    Complete,
    Warning,
    Error,
}

impl PhaseState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Complete => "complete",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computed status for one phase: identifier, verdict, and a short detail
/// line (counts or a static label).
///
/// Statuses are ephemeral: recomputed fresh on every diagnostics request and
/// never cached across plan mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStatus {
    pub phase: PhaseId,
    pub state: PhaseState,
    pub detail: String,
}

/// Static, process-wide definition of one pipeline phase.
///
/// Definitions carry the dependency edges checked before a repair is
/// accepted and the pure predicate that derives the phase's status from a
/// plan snapshot. The registry of all definitions lives in
/// `coursegen-status`.
pub struct PhaseDefinition {
    /// Stable identifier.
    pub id: PhaseId,
    /// Human-readable label (mirrors [`PhaseId::label`]).
    pub label: &'static str,
    /// Phases that must evaluate `Complete` before this one is repairable.
    pub depends_on: &'static [PhaseId],
    /// Pure status predicate over a plan snapshot.
    pub evaluate: fn(&CoursePlan) -> PhaseStatus,
}
