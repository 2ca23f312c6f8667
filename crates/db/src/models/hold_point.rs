//! Hold point rows.

use sqlx::types::Json;
use sqlx::FromRow;

use pilelog_core::hold_point::ChecklistItem;
use pilelog_core::types::{DbId, Timestamp};
use pilelog_store::{HoldPoint, StoreError};

use super::corrupt;

/// A row from the `hold_points` table.
#[derive(Debug, Clone, FromRow)]
pub struct HoldPointRow {
    pub id: DbId,
    pub activity_id: String,
    pub hold_point_type: String,
    pub status: String,
    pub checklist: Json<Vec<ChecklistItem>>,
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

impl HoldPointRow {
    pub fn into_record(self) -> Result<HoldPoint, StoreError> {
        Ok(HoldPoint {
            hold_point_type: self
                .hold_point_type
                .parse()
                .map_err(|e| corrupt("hold_points", e))?,
            status: self.status.parse().map_err(|e| corrupt("hold_points", e))?,
            id: self.id,
            activity_id: self.activity_id,
            checklist: self.checklist.0,
            signed_by_name: self.signed_by_name,
            signed_by_id: self.signed_by_id,
            signed_at: self.signed_at,
            signature_data: self.signature_data,
            comments: self.comments,
            rejection_notes: self.rejection_notes,
            rejected_by_id: self.rejected_by_id,
            rejected_at: self.rejected_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
