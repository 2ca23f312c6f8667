use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use pilelog_core::activity::ActivityStatus;
use pilelog_core::details::{enrich_details, ActivityType};
use pilelog_core::error::CoreError;
use pilelog_core::hold_point::{ChecklistItem, HoldPointStatus, HoldPointType};
use pilelog_core::patch::{ActivityPatch, CreateActivity};
use pilelog_core::sync::ChangeAction;
use pilelog_core::types::{DbId, EntityId, Timestamp};

/// Stock movement type written when approval consumes material.
pub const MOVEMENT_DEDUCT: &str = "DEDUCT";

// ---------------------------------------------------------------------------
// Change log
// ---------------------------------------------------------------------------

/// An applied mutation. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub server_version: i64,
    pub actor_id: DbId,
    pub client_change_id: String,
    pub action: ChangeAction,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: Value,
    pub applied_at: Timestamp,
}

/// A change log entry before the store assigns its version.
#[derive(Debug, Clone)]
pub struct NewChangeLogEntry {
    pub actor_id: DbId,
    pub client_change_id: String,
    pub action: ChangeAction,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: EntityId,
    pub site_id: DbId,
    pub activity_type: ActivityType,
    pub activity_date: NaiveDate,
    pub status: ActivityStatus,
    /// Raw inputs plus derived quantities.
    pub details: Value,
    pub notes: Option<String>,
    pub version: i64,
    pub client_change_id: Option<String>,
    pub created_by: DbId,
    pub approved_by: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    pub rejection_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Activity {
    /// Build a new DRAFT activity with derived quantities filled in.
    pub fn new_draft(
        id: EntityId,
        created_by: DbId,
        input: CreateActivity,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        let details = enrich_details(input.activity_type, &input.details)?;
        Ok(Self {
            id,
            site_id: input.site_id,
            activity_type: input.activity_type,
            activity_date: input.activity_date,
            status: ActivityStatus::Draft,
            details,
            notes: input.notes,
            version: 1,
            client_change_id: input.client_change_id,
            created_by,
            approved_by: None,
            approved_at: None,
            rejection_notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Soft-delete predicate applied by every read path.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Last-write-wins merge of `patch` into this activity.
    ///
    /// Derived quantities are recomputed when the type or details change.
    /// Does not touch `status` or `version`.
    pub fn apply_patch(&mut self, patch: &ActivityPatch) -> Result<(), CoreError> {
        if let Some(site_id) = patch.site_id {
            self.site_id = site_id;
        }
        if let Some(kind) = patch.activity_type {
            self.activity_type = kind;
        }
        if let Some(date) = patch.activity_date {
            self.activity_date = date;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if patch.touches_details() {
            let raw = patch.details.as_ref().unwrap_or(&self.details);
            self.details = enrich_details(self.activity_type, raw)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hold points
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldPoint {
    pub id: DbId,
    pub activity_id: EntityId,
    pub hold_point_type: HoldPointType,
    pub status: HoldPointStatus,
    pub checklist: Vec<ChecklistItem>,
    pub signed_by_name: Option<String>,
    pub signed_by_id: Option<DbId>,
    pub signed_at: Option<Timestamp>,
    pub signature_data: Option<String>,
    pub comments: Option<String>,
    pub rejection_notes: Option<String>,
    pub rejected_by_id: Option<DbId>,
    pub rejected_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewHoldPoint {
    pub activity_id: EntityId,
    pub hold_point_type: HoldPointType,
    pub checklist: Vec<ChecklistItem>,
}

// ---------------------------------------------------------------------------
// Materials and equipment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: DbId,
    pub site_id: DbId,
    pub name: String,
    pub unit: String,
    pub current_stock: f64,
    pub minimum_stock: f64,
}

/// One row of a material's stock history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: DbId,
    pub material_id: DbId,
    pub movement_type: String,
    /// Signed: deductions are negative.
    pub quantity: f64,
    pub resulting_stock: f64,
    pub activity_id: Option<EntityId>,
    pub actor_id: Option<DbId>,
    pub note: Option<String>,
    pub created_at: Timestamp,
}

/// Request to consume `quantity` of a material for an activity.
#[derive(Debug, Clone)]
pub struct MaterialDeduction {
    pub material_id: DbId,
    pub activity_id: EntityId,
    pub actor_id: DbId,
    pub quantity: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeductionOutcome {
    /// Stock decremented; carries the updated material.
    Deducted(Material),
    /// A DEDUCT movement already exists for this (material, activity).
    AlreadyDeducted,
    /// Stock would go negative; nothing written.
    InsufficientStock { available: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: DbId,
    pub site_id: DbId,
    pub name: String,
    pub usage_hours: f64,
    pub productive_hours: f64,
    pub downtime_hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn draft() -> Activity {
        let input = CreateActivity::from_payload(&json!({
            "siteId": 1,
            "activityType": "BORED_PILING",
            "activityDate": "2026-02-01",
            "details": {"diameter": 1200, "depth": 10, "concreteVolume": 13}
        }))
        .unwrap();
        Activity::new_draft("a1".into(), 5, input, Utc::now()).unwrap()
    }

    #[test]
    fn new_draft_is_enriched() {
        let a = draft();
        assert_eq!(a.status, ActivityStatus::Draft);
        assert_eq!(a.version, 1);
        assert_eq!(a.details["overconsumptionPct"], 14.9);
        assert!(a.is_active());
    }

    #[test]
    fn patch_overwrites_present_fields_only() {
        let mut a = draft();
        let patch = ActivityPatch::from_payload(&json!({"notes": "cleaned base"})).unwrap();
        a.apply_patch(&patch).unwrap();
        assert_eq!(a.notes.as_deref(), Some("cleaned base"));
        assert_eq!(a.details["depth"], 10);
        assert_eq!(a.site_id, 1);
    }

    #[test]
    fn patch_details_recomputes_derived() {
        let mut a = draft();
        let patch = ActivityPatch::from_payload(&json!({
            "details": {"diameter": 1200, "depth": 20, "concreteVolume": 22.62}
        }))
        .unwrap();
        a.apply_patch(&patch).unwrap();
        let theoretical = a.details["theoreticalVolume"].as_f64().unwrap();
        assert!((theoretical - 22.619).abs() < 0.001);
        assert_eq!(a.details["overconsumptionPct"], 0.0);
    }
}
