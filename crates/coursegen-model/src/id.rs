//! Plan ID validation
//!
//! Plan IDs are used as directory names in the file-backed store and as lock
//! table keys, so they are restricted to a filesystem-safe character set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length for a plan ID, in bytes.
const MAX_LEN: usize = 128;

/// Error type for plan ID validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanIdError {
    #[error("Plan ID is empty")]
    Empty,

    #[error("Plan ID exceeds {MAX_LEN} bytes: {len}")]
    TooLong { len: usize },

    #[error("Plan ID contains invalid character '{ch}' (allowed: A-Z, a-z, 0-9, '.', '-', '_')")]
    InvalidCharacter { ch: char },
}

/// Opaque identifier for a curriculum plan.
///
/// A `PlanId` is validated at construction: non-empty, at most 128 bytes,
/// and limited to `[A-Za-z0-9._-]`. It is used as a directory name by the
/// store and as the key in the repair lock table.
///
/// # Example
///
/// ```rust
/// use coursegen_model::PlanId;
///
/// let id: PlanId = "onboarding-2026".parse().unwrap();
/// assert_eq!(id.as_str(), "onboarding-2026");
/// assert!("no spaces".parse::<PlanId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlanId(String);

impl PlanId {
    /// Validate and wrap a raw plan ID.
    ///
    /// # Errors
    /// Returns [`PlanIdError`] if the ID is empty, too long, or contains a
    /// character outside `[A-Za-z0-9._-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, PlanIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PlanIdError::Empty);
        }
        if raw.len() > MAX_LEN {
            return Err(PlanIdError::TooLong { len: raw.len() });
        }
        if let Some(ch) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(PlanIdError::InvalidCharacter { ch });
        }
        Ok(Self(raw))
    }

    /// The validated ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PlanId {
    type Err = PlanIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PlanId {
    type Error = PlanIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlanId> for String {
    fn from(id: PlanId) -> Self {
        id.0
    }
}
