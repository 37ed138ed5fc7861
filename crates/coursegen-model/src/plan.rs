//! Plan, module, lesson, and quiz document types.
//!
//! Representation rule: absence is modeled as `Option::None` (for scalar
//! enrichment fields) or an empty `Vec` (for collections). JSON documents
//! that omit a field, carry `null`, or carry `[]` all deserialize to the
//! same in-memory state, so counting never depends on how a writer spelled
//! "nothing here yet". An empty string is a present value, not a missing one.

use crate::id::PlanId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A curriculum plan under construction.
///
/// The plan is created when the master-plan phase first succeeds and is
/// mutated only by phase executors. Everything in this crate treats it as a
/// read-only snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePlan {
    /// Identifier of this plan; doubles as the store directory name.
    pub id: PlanId,
    /// Human-readable course title.
    pub title: String,
    /// Ordered module sequence. Empty means the master-plan phase has not
    /// produced output yet.
    #[serde(default)]
    pub modules: Vec<Module>,
    /// RFC3339 UTC timestamp of plan creation.
    pub created_at: DateTime<Utc>,
    /// RFC3339 UTC timestamp of the last phase write.
    pub updated_at: DateTime<Utc>,
}

/// One module of a plan, owning an ordered lesson sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Identifier unique within the plan.
    pub id: String,
    /// Module title.
    pub title: String,
    /// Ordered lessons. Empty signals lesson-generation incompleteness for
    /// this module.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

/// One lesson of a module, with optional enrichment fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Identifier unique within the module.
    pub id: String,
    /// Lesson title.
    pub title: String,
    /// Narration script produced by the enrichment phase. `None` signals
    /// enrichment incompleteness for this lesson.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voiceover_script: Option<String>,
    /// Quiz produced by the enrichment phase, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
}

/// Quiz content attached to a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

/// A single multiple-choice quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    #[serde(default)]
    pub choices: Vec<String>,
    /// Index into `choices` of the correct answer.
    pub answer: usize,
}

impl CoursePlan {
    /// Create an empty plan shell with no modules.
    #[must_use]
    pub fn new(id: PlanId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            modules: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of modules in the plan.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of modules whose lesson sequence is empty.
    #[must_use]
    pub fn modules_missing_lessons(&self) -> usize {
        self.modules.iter().filter(|m| m.lessons.is_empty()).count()
    }

    /// Number of lessons, across all modules, lacking a voiceover script.
    ///
    /// A module with zero lessons contributes zero here; the count is
    /// independent of [`modules_missing_lessons`](Self::modules_missing_lessons).
    #[must_use]
    pub fn lessons_missing_script(&self) -> usize {
        self.modules
            .iter()
            .flat_map(|m| &m.lessons)
            .filter(|l| l.voiceover_script.is_none())
            .count()
    }

    /// Total lesson count across all modules.
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}
