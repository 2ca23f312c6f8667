//! Change log rows.

use sqlx::FromRow;

use pilelog_core::types::{DbId, Timestamp};
use pilelog_store::{ChangeLogEntry, StoreError};

use super::corrupt;

/// A row from the `change_log` table.
#[derive(Debug, Clone, FromRow)]
pub struct ChangeLogRow {
    pub server_version: i64,
    pub actor_id: DbId,
    pub client_change_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub applied_at: Timestamp,
}

impl ChangeLogRow {
    pub fn into_record(self) -> Result<ChangeLogEntry, StoreError> {
        Ok(ChangeLogEntry {
            action: self.action.parse().map_err(|e| corrupt("change_log", e))?,
            server_version: self.server_version,
            actor_id: self.actor_id,
            client_change_id: self.client_change_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            payload: self.payload,
            applied_at: self.applied_at,
        })
    }
}
