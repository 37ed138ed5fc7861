//! CLI exit code mapping.
//!
//! Each request-time failure class gets a distinct code so automation can
//! branch on the outcome without parsing stderr.

use coursegen_engine::RepairError;

/// Exit codes emitted by the `coursegen` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success,
    /// Unclassified failure.
    General,
    /// Usage or configuration error.
    Usage,
    /// Plan not found.
    NotFound,
    /// Requested phase token is not registered.
    UnknownPhase,
    /// A dependency of a requested phase is not complete.
    DependencyUnmet,
    /// Another repair run holds the plan's lock.
    LockHeld,
    /// The repair run failed (executor error or stall timeout).
    RunFailed,
    /// The repair run was cancelled.
    Cancelled,
}

impl ExitCode {
    /// Numeric process exit code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::General => 1,
            Self::Usage => 2,
            Self::NotFound => 3,
            Self::UnknownPhase => 4,
            Self::DependencyUnmet => 5,
            Self::LockHeld => 6,
            Self::RunFailed => 7,
            Self::Cancelled => 8,
        }
    }
}

impl From<&RepairError> for ExitCode {
    fn from(err: &RepairError) -> Self {
        match err {
            RepairError::EmptyRequest => Self::Usage,
            RepairError::UnknownPhase { .. } => Self::UnknownPhase,
            RepairError::DependencyUnmet { .. } => Self::DependencyUnmet,
            RepairError::LockHeld { .. } => Self::LockHeld,
            RepairError::PlanNotFound { .. } => Self::NotFound,
            RepairError::Store(_) | RepairError::Internal { .. } => Self::General,
        }
    }
}
