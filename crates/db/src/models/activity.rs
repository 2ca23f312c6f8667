//! Activity rows.

use chrono::NaiveDate;
use sqlx::FromRow;

use pilelog_core::types::{DbId, Timestamp};
use pilelog_store::{Activity, StoreError};

use super::corrupt;

/// A row from the `activities` table.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: String,
    pub site_id: DbId,
    pub activity_type: String,
    pub activity_date: NaiveDate,
    pub status: String,
    pub details: serde_json::Value,
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

impl ActivityRow {
    pub fn into_record(self) -> Result<Activity, StoreError> {
        Ok(Activity {
            activity_type: self
                .activity_type
                .parse()
                .map_err(|e| corrupt("activities", e))?,
            status: self.status.parse().map_err(|e| corrupt("activities", e))?,
            id: self.id,
            site_id: self.site_id,
            activity_date: self.activity_date,
            details: self.details,
            notes: self.notes,
            version: self.version,
            client_change_id: self.client_change_id,
            created_by: self.created_by,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            rejection_notes: self.rejection_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}
