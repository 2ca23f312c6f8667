//! Sync protocol vocabulary shared by the engine, the stores, and the API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Entity type name for field activities.
pub const ENTITY_ACTIVITY: &str = "activity";

/// Entity type name for hold points (server-authored log entries only).
pub const ENTITY_HOLD_POINT: &str = "hold_point";

/// Prefix of change ids generated for server-authored log entries.
pub const SERVER_CHANGE_PREFIX: &str = "srv-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Update => "UPDATE",
            ChangeAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(ChangeAction::Create),
            "UPDATE" => Ok(ChangeAction::Update),
            "DELETE" => Ok(ChangeAction::Delete),
            other => Err(CoreError::Validation(format!(
                "Unknown change action '{other}'"
            ))),
        }
    }
}

/// One client-generated mutation, as pushed by a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncChange {
    pub client_change_id: String,
    pub action: ChangeAction,
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Device clock at the time of the local edit. Informational only.
    pub timestamp: Option<Timestamp>,
}

/// A pushed document that does not decode as a [`SyncChange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedChange {
    /// Taken from the raw document when present, else empty.
    pub client_change_id: String,
    pub reason: String,
}

impl SyncChange {
    /// Decode one element of a push batch. A bad element is reported on its
    /// own so the rest of the batch can still be applied.
    pub fn from_document(document: serde_json::Value) -> Result<Self, MalformedChange> {
        let client_change_id = document
            .get("clientChangeId")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        serde_json::from_value(document).map_err(|e| MalformedChange {
            client_change_id,
            reason: format!("Malformed change: {e}"),
        })
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.client_change_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "clientChangeId must not be empty".to_string(),
            ));
        }
        if self.entity_type.trim().is_empty() || self.entity_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "entityType and entityId must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn key(&self) -> IdempotencyKey {
        IdempotencyKey {
            client_change_id: self.client_change_id.clone(),
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
        }
    }
}

/// Dedup key of the idempotency ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyKey {
    pub client_change_id: String,
    pub entity_type: String,
    pub entity_id: String,
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.client_change_id, self.entity_type, self.entity_id
        )
    }
}
