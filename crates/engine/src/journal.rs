//! Change log entries for server-authored mutations.
//!
//! Interactive workflow writes are logged like pushed changes so pull
//! replicates them, under a generated `srv-` client change id.

use serde::Serialize;

use pilelog_core::error::CoreError;
use pilelog_core::sync::{ChangeAction, SERVER_CHANGE_PREFIX};
use pilelog_core::types::DbId;
use pilelog_store::{ChangeLogEntry, NewChangeLogEntry, Store};

pub(crate) fn server_change_id() -> String {
    format!("{SERVER_CHANGE_PREFIX}{}", uuid::Uuid::new_v4())
}

/// Append a log entry whose payload is the serialized `snapshot`.
pub(crate) async fn record<S: Store, T: Serialize + Sync>(
    store: &S,
    tx: &mut S::Tx,
    actor_id: DbId,
    action: ChangeAction,
    entity_type: &str,
    entity_id: &str,
    snapshot: &T,
) -> Result<ChangeLogEntry, CoreError> {
    let payload = serde_json::to_value(snapshot)
        .map_err(|e| CoreError::Internal(format!("failed to serialize {entity_type}: {e}")))?;
    let entry = store
        .append_change(
            tx,
            NewChangeLogEntry {
                actor_id,
                client_change_id: server_change_id(),
                action,
                entity_type: entity_type.to_string(),
                entity_id: entity_id.to_string(),
                payload,
            },
        )
        .await?;
    tracing::debug!(
        server_version = entry.server_version,
        entity_type,
        entity_id,
        action = %action,
        "Logged server change"
    );
    Ok(entry)
}
