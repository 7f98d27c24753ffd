//! Plan status state machine for screens.
//!
//! The discriminants match the seed rows of the `plan_statuses` lookup
//! table. On the wire the status is the SCREAMING_SNAKE_CASE name.
//!
//! ```text
//! NOT_GENERATED ──start──▶ IN_PROGRESS ──plan stored──▶ COMPLETED
//!       ▲                      │                            │
//!       └──────failure─────────┘◀────────regenerate─────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::validation::has_text;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Generation progress of a screen's implementation plan.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    NotGenerated = 1,
    InProgress = 2,
    Completed = 3,
}

impl PlanStatus {
    pub const ALL: [PlanStatus; 3] = [Self::NotGenerated, Self::InProgress, Self::Completed];

    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotGenerated => "NOT_GENERATED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    /// Whether a generation request may be started from this status.
    ///
    /// Only an in-flight generation blocks a new one; completed plans can
    /// be regenerated.
    pub fn can_generate(self) -> bool {
        self != Self::InProgress
    }

    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the wire names produced by [`PlanStatus::as_str`], for clients
/// and tools that read statuses outside of serde.
impl FromStr for PlanStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown plan status '{s}'")))
    }
}

impl TryFrom<StatusId> for PlanStatus {
    type Error = CoreError;

    fn try_from(id: StatusId) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.id() == id)
            .ok_or_else(|| CoreError::Internal(format!("Unknown plan status id {id}")))
    }
}

impl From<PlanStatus> for StatusId {
    fn from(value: PlanStatus) -> Self {
        value.id()
    }
}

/// Check that moving a screen from `from` to `to` is a legal transition.
pub fn validate_transition(from: PlanStatus, to: PlanStatus) -> Result<(), CoreError> {
    use PlanStatus::*;

    let allowed = matches!(
        (from, to),
        (NotGenerated, InProgress)
            | (Completed, InProgress)
            | (InProgress, Completed)
            | (InProgress, NotGenerated)
    );
    if allowed {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Cannot change plan status from {from} to {to}"
        )))
    }
}

/// Gate for starting plan generation on a screen.
///
/// Documentation is checked first so a screen that is both undocumented and
/// idle reports the actionable problem.
pub fn ensure_generation_allowed(
    status: PlanStatus,
    documentation: Option<&str>,
) -> Result<(), CoreError> {
    if !has_text(documentation) {
        return Err(CoreError::Validation(
            "Documentation is required before generating a plan".into(),
        ));
    }
    if !status.can_generate() {
        return Err(CoreError::Conflict(
            "Plan generation is already in progress for this screen".into(),
        ));
    }
    Ok(())
}

/// A plan can only be marked completed once it has text.
pub fn ensure_plan_present(plan: &str) -> Result<(), CoreError> {
    if plan.trim().is_empty() {
        return Err(CoreError::Validation(
            "A completed plan must contain text".into(),
        ));
    }
    Ok(())
}
