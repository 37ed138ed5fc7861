//! Phase registry and status derivation rules.
//!
//! One rule per pipeline phase, each a pure function of the plan snapshot:
//!
//! - Context Indexing is always `Ready`: the corpus index is a shared,
//!   global step with no per-plan incompleteness signal, so the detail is a
//!   static label rather than a count.
//! - Master Plan is `Complete` iff the module sequence is non-empty,
//!   otherwise `Error` — downstream phases cannot run against an empty plan.
//! - Lesson Generation counts modules with zero lessons; any deficit is a
//!   `Warning`, never an `Error`, because a partially-lesson'd plan remains
//!   usable.
//! - Enrichment counts lessons lacking a voiceover script. A module with
//!   zero lessons contributes nothing here; the two counts are independent.

use anyhow::{Context, Result};
use coursegen_model::CoursePlan;
use coursegen_phase_api::{PhaseDefinition, PhaseId, PhaseState, PhaseStatus};

fn context_indexing(_plan: &CoursePlan) -> PhaseStatus {
    PhaseStatus {
        phase: PhaseId::ContextIndexing,
        state: PhaseState::Ready,
        detail: "shared corpus index".to_string(),
    }
}

fn master_plan(plan: &CoursePlan) -> PhaseStatus {
    let count = plan.module_count();
    let state = if count == 0 {
        PhaseState::Error
    } else {
        PhaseState::Complete
    };
    PhaseStatus {
        phase: PhaseId::MasterPlan,
        state,
        detail: format!("{count} modules"),
    }
}

fn lesson_generation(plan: &CoursePlan) -> PhaseStatus {
    let missing = plan.modules_missing_lessons();
    let state = if missing == 0 {
        PhaseState::Complete
    } else {
        PhaseState::Warning
    };
    PhaseStatus {
        phase: PhaseId::LessonGeneration,
        state,
        detail: format!("{missing} modules without lessons"),
    }
}

fn enrichment(plan: &CoursePlan) -> PhaseStatus {
    let missing = plan.lessons_missing_script();
    let state = if missing == 0 {
        PhaseState::Complete
    } else {
        PhaseState::Warning
    };
    PhaseStatus {
        phase: PhaseId::Enrichment,
        state,
        detail: format!("{missing} lessons missing voiceover"),
    }
}

/// The process-wide phase registry, in pipeline order.
///
/// Dependency edges require the named phases to evaluate `Complete` before a
/// repair of the dependent phase is accepted. Context Indexing never reports
/// `Complete` (it is `Ready` at best), so nothing depends on it; lesson
/// generation and enrichment both gate only on the master plan, which keeps
/// enrichment repairable on a partially-lesson'd plan.
static REGISTRY: [PhaseDefinition; 4] = [
    PhaseDefinition {
        id: PhaseId::ContextIndexing,
        label: "Context Indexing",
        depends_on: &[],
        evaluate: context_indexing,
    },
    PhaseDefinition {
        id: PhaseId::MasterPlan,
        label: "Master Plan",
        depends_on: &[],
        evaluate: master_plan,
    },
    PhaseDefinition {
        id: PhaseId::LessonGeneration,
        label: "Lesson Generation",
        depends_on: &[PhaseId::MasterPlan],
        evaluate: lesson_generation,
    },
    PhaseDefinition {
        id: PhaseId::Enrichment,
        label: "Enrichment",
        depends_on: &[PhaseId::MasterPlan],
        evaluate: enrichment,
    },
];

/// All registered phase definitions, in pipeline order.
#[must_use]
pub fn definitions() -> &'static [PhaseDefinition] {
    &REGISTRY
}

/// Look up the definition for a phase.
#[must_use]
pub fn definition(id: PhaseId) -> &'static PhaseDefinition {
    REGISTRY
        .iter()
        .find(|d| d.id == id)
        .expect("every PhaseId variant is registered")
}

/// Evaluate a plan snapshot against every registered phase.
///
/// The result is total and ordered: one entry per registered phase, in fixed
/// definition order, regardless of how broken the plan is. Repeated calls on
/// an unchanged snapshot yield identical output.
#[must_use]
pub fn evaluate(plan: &CoursePlan) -> Vec<PhaseStatus> {
    REGISTRY.iter().map(|d| (d.evaluate)(plan)).collect()
}

/// Emit a status sequence as pretty-printed JSON (for `--json` output).
pub fn emit_json_pretty(statuses: &[PhaseStatus]) -> Result<String> {
    serde_json::to_string_pretty(statuses).context("Failed to serialize phase statuses")
}
