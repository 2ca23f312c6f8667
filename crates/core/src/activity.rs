//! Activity lifecycle: statuses and the transitions between them.
//!
//! ```text
//!   DRAFT ──submit──▶ SUBMITTED ──approve──▶ APPROVED (terminal)
//!     ▲                   │
//!     │ edit            reject
//!     │                   ▼
//!     └──── edit ──── REJECTED ──submit──▶ SUBMITTED
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of a field activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl ActivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Draft => "DRAFT",
            ActivityStatus::Submitted => "SUBMITTED",
            ActivityStatus::Approved => "APPROVED",
            ActivityStatus::Rejected => "REJECTED",
        }
    }

    /// Whether the creator may still change content in this status.
    pub fn is_editable(self) -> bool {
        matches!(self, ActivityStatus::Draft | ActivityStatus::Rejected)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(ActivityStatus::Draft),
            "SUBMITTED" => Ok(ActivityStatus::Submitted),
            "APPROVED" => Ok(ActivityStatus::Approved),
            "REJECTED" => Ok(ActivityStatus::Rejected),
            other => Err(CoreError::Validation(format!(
                "Unknown activity status '{other}'"
            ))),
        }
    }
}

/// A status-changing operation on an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Approve,
    Reject,
}

impl Transition {
    pub fn verb(self) -> &'static str {
        match self {
            Transition::Submit => "submit",
            Transition::Approve => "approve",
            Transition::Reject => "reject",
        }
    }

    /// Statuses this transition may start from.
    pub fn sources(self) -> &'static [ActivityStatus] {
        match self {
            Transition::Submit => &[ActivityStatus::Draft, ActivityStatus::Rejected],
            Transition::Approve | Transition::Reject => &[ActivityStatus::Submitted],
        }
    }

    pub fn target(self) -> ActivityStatus {
        match self {
            Transition::Submit => ActivityStatus::Submitted,
            Transition::Approve => ActivityStatus::Approved,
            Transition::Reject => ActivityStatus::Rejected,
        }
    }

    /// Validate `from` against this transition and return the new status.
    pub fn apply(self, from: ActivityStatus) -> Result<ActivityStatus, CoreError> {
        if self.sources().contains(&from) {
            return Ok(self.target());
        }
        let required = self
            .sources()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(CoreError::Validation(format!(
            "Cannot {} an activity in {from} status; it must be {required}",
            self.verb()
        )))
    }
}

/// Content edits are allowed only while DRAFT or REJECTED.
pub fn ensure_editable(status: ActivityStatus) -> Result<(), CoreError> {
    if status.is_editable() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot edit an activity in {status} status; it must be DRAFT or REJECTED"
        )))
    }
}

/// Deletion is allowed from every status except APPROVED.
pub fn ensure_deletable(status: ActivityStatus) -> Result<(), CoreError> {
    if status == ActivityStatus::Approved {
        Err(CoreError::Validation(
            "Approved activities cannot be deleted".to_string(),
        ))
    } else {
        Ok(())
    }
}
