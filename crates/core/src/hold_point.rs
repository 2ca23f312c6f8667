//! Hold points: the three sequential inspection sign-offs on an activity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Inspection stage, in the fixed order it must be signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldPointType {
    PreBoring,
    PreCage,
    PreConcrete,
}

/// All stages in signing order.
pub const HOLD_POINT_SEQUENCE: [HoldPointType; 3] = [
    HoldPointType::PreBoring,
    HoldPointType::PreCage,
    HoldPointType::PreConcrete,
];

impl HoldPointType {
    pub fn as_str(self) -> &'static str {
        match self {
            HoldPointType::PreBoring => "PRE_BORING",
            HoldPointType::PreCage => "PRE_CAGE",
            HoldPointType::PreConcrete => "PRE_CONCRETE",
        }
    }

    /// 1-based position in the signing sequence.
    pub fn sequence(self) -> i16 {
        match self {
            HoldPointType::PreBoring => 1,
            HoldPointType::PreCage => 2,
            HoldPointType::PreConcrete => 3,
        }
    }

    /// The stage that must be APPROVED before this one can be signed.
    pub fn previous(self) -> Option<HoldPointType> {
        match self {
            HoldPointType::PreBoring => None,
            HoldPointType::PreCage => Some(HoldPointType::PreBoring),
            HoldPointType::PreConcrete => Some(HoldPointType::PreCage),
        }
    }

    pub fn default_checklist(self) -> Vec<ChecklistItem> {
        let items: &[&str] = match self {
            HoldPointType::PreBoring => &[
                "Pile position set out and verified",
                "Underground services cleared",
                "Rig and tooling inspected",
                "Casing verticality checked",
            ],
            HoldPointType::PreCage => &[
                "Bore depth confirmed against design",
                "Base cleaned and inspected",
                "Cage dimensions and lap lengths verified",
                "Cover spacers fitted",
            ],
            HoldPointType::PreConcrete => &[
                "Cage level and position checked",
                "Tremie pipe inspected",
                "Concrete mix and slump approved",
                "Bore stability confirmed",
            ],
        };
        items.iter().map(|i| ChecklistItem::new(*i)).collect()
    }
}

impl fmt::Display for HoldPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HoldPointType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HOLD_POINT_SEQUENCE
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown hold point type '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldPointStatus {
    Pending,
    Approved,
    Rejected,
}

impl HoldPointStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HoldPointStatus::Pending => "PENDING",
            HoldPointStatus::Approved => "APPROVED",
            HoldPointStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for HoldPointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HoldPointStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(HoldPointStatus::Pending),
            "APPROVED" => Ok(HoldPointStatus::Approved),
            "REJECTED" => Ok(HoldPointStatus::Rejected),
            other => Err(CoreError::Validation(format!(
                "Unknown hold point status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item: String,
    #[serde(default)]
    pub checked: bool,
}

impl ChecklistItem {
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            checked: false,
        }
    }
}

/// Sign-off submitted by an inspector.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOff {
    /// Replaces the stored checklist when present.
    pub checklist: Option<Vec<ChecklistItem>>,
    pub signature_data: Option<String>,
    pub signed_by_name: String,
    pub comments: Option<String>,
}

impl SignOff {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.signed_by_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "signedByName must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A stage can only be decided once.
pub fn ensure_pending(status: HoldPointStatus) -> Result<(), CoreError> {
    if status == HoldPointStatus::Pending {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Hold point is already {status}; only PENDING hold points can be signed or rejected"
        )))
    }
}

/// Check the stage before `kind` is APPROVED.
///
/// `previous` is the status of the preceding stage, `None` if it is missing.
pub fn ensure_previous_approved(
    kind: HoldPointType,
    previous: Option<HoldPointStatus>,
) -> Result<(), CoreError> {
    let Some(prev_kind) = kind.previous() else {
        return Ok(());
    };
    match previous {
        Some(HoldPointStatus::Approved) => Ok(()),
        _ => Err(CoreError::Validation(format!(
            "Previous hold point must be approved first: {prev_kind} is not APPROVED"
        ))),
    }
}
