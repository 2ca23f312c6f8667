//! Sync protocol: push, pull, and status.
//!
//! Each pushed change runs in its own transaction: ledger check, apply,
//! change log append, and ledger record commit together or not at all. A
//! failed change consumes no server version and never aborts its siblings.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use pilelog_core::error::CoreError;
use pilelog_core::roles::{Actor, Authorizer, Capability};
use pilelog_core::sync::{MalformedChange, SyncChange};
use pilelog_store::{ChangeLogEntry, NewChangeLogEntry, Store};

use crate::applier::{ApplierRegistry, ApplyContext, ApplyOutcome};
use crate::EngineConfig;

/// Per-change failure reported back to the pushing client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushError {
    pub client_change_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    pub applied: usize,
    pub skipped: usize,
    pub errors: Vec<PushError>,
    pub server_version: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResult {
    pub changes: Vec<ChangeLogEntry>,
    pub server_version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub server_version: i64,
    pub pending_for_user: i64,
}

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// What the pushing client sees for a failed change. Internal details stay
/// in the server log.
fn client_message(err: &CoreError) -> String {
    match err {
        CoreError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

enum ChangeOutcome {
    Applied(i64),
    Skipped,
}

pub struct SyncService<S: Store> {
    store: Arc<S>,
    authorizer: Arc<dyn Authorizer>,
    appliers: ApplierRegistry<S>,
    config: EngineConfig,
}

impl<S: Store> SyncService<S> {
    pub fn new(
        store: Arc<S>,
        authorizer: Arc<dyn Authorizer>,
        appliers: ApplierRegistry<S>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            authorizer,
            appliers,
            config,
        }
    }

    /// Apply a batch of client changes in submission order.
    pub async fn push(&self, actor: &Actor, changes: Vec<SyncChange>) -> Result<PushResult, CoreError> {
        self.push_batch(actor, changes.into_iter().map(Ok).collect()).await
    }

    /// Like [`push`](Self::push), for raw JSON documents. Elements that do
    /// not decode are reported as errors; the rest are still applied.
    pub async fn push_documents(
        &self,
        actor: &Actor,
        documents: Vec<serde_json::Value>,
    ) -> Result<PushResult, CoreError> {
        let changes = documents
            .into_iter()
            .map(SyncChange::from_document)
            .collect();
        self.push_batch(actor, changes).await
    }

    async fn push_batch(
        &self,
        actor: &Actor,
        changes: Vec<Result<SyncChange, MalformedChange>>,
    ) -> Result<PushResult, CoreError> {
        self.authorizer.require(actor, Capability::SyncData)?;
        if changes.len() > self.config.max_batch {
            return Err(CoreError::Validation(format!(
                "Push contains {} changes; the maximum is {}",
                changes.len(),
                self.config.max_batch
            )));
        }

        let mut result = PushResult {
            applied: 0,
            skipped: 0,
            errors: Vec::new(),
            server_version: 0,
        };

        for change in &changes {
            let change = match change {
                Ok(change) => change,
                Err(malformed) => {
                    tracing::warn!(
                        actor_id = actor.user_id,
                        client_change_id = %malformed.client_change_id,
                        error = %malformed.reason,
                        "Change rejected"
                    );
                    result.errors.push(PushError {
                        client_change_id: malformed.client_change_id.clone(),
                        error: malformed.reason.clone(),
                    });
                    continue;
                }
            };
            match self.push_one(actor, change).await {
                Ok(ChangeOutcome::Applied(version)) => {
                    tracing::debug!(
                        actor_id = actor.user_id,
                        client_change_id = %change.client_change_id,
                        server_version = version,
                        "Change applied"
                    );
                    result.applied += 1;
                }
                Ok(ChangeOutcome::Skipped) => {
                    tracing::debug!(
                        actor_id = actor.user_id,
                        client_change_id = %change.client_change_id,
                        "Change already applied, skipped"
                    );
                    result.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        actor_id = actor.user_id,
                        client_change_id = %change.client_change_id,
                        entity_type = %change.entity_type,
                        entity_id = %change.entity_id,
                        error = %e,
                        "Change rejected"
                    );
                    result.errors.push(PushError {
                        client_change_id: change.client_change_id.clone(),
                        error: client_message(&e),
                    });
                }
            }
        }

        result.server_version = self.store.current_version().await?;
        tracing::info!(
            actor_id = actor.user_id,
            applied = result.applied,
            skipped = result.skipped,
            failed = result.errors.len(),
            server_version = result.server_version,
            "Push processed"
        );
        Ok(result)
    }

    async fn push_one(&self, actor: &Actor, change: &SyncChange) -> Result<ChangeOutcome, CoreError> {
        change.validate()?;
        let applier = self.appliers.get(&change.entity_type)?;
        let key = change.key();
        let ctx = ApplyContext {
            actor_id: actor.user_id,
            enforce_edit_lock: self.config.enforce_edit_lock,
            now: Utc::now(),
        };

        let mut tx = self.store.begin().await?;
        if self.store.ledger_contains(&mut tx, &key).await? {
            return Ok(ChangeOutcome::Skipped);
        }

        let outcome = applier.apply(self.store.as_ref(), &mut tx, &ctx, change).await?;
        let version = match outcome {
            ApplyOutcome::AlreadyApplied => None,
            ApplyOutcome::Applied => {
                let entry = self
                    .store
                    .append_change(
                        &mut tx,
                        NewChangeLogEntry {
                            actor_id: actor.user_id,
                            client_change_id: change.client_change_id.clone(),
                            action: change.action,
                            entity_type: change.entity_type.clone(),
                            entity_id: change.entity_id.clone(),
                            payload: change.payload.clone(),
                        },
                    )
                    .await?;
                Some(entry.server_version)
            }
        };
        self.store.ledger_record(&mut tx, &key, actor.user_id).await?;
        self.store.commit(tx).await?;

        Ok(version.map_or(ChangeOutcome::Skipped, ChangeOutcome::Applied))
    }

    /// Everything after `since_version` written by other actors, ascending.
    pub async fn pull(&self, actor: &Actor, since_version: i64) -> Result<PullResult, CoreError> {
        self.authorizer.require(actor, Capability::SyncData)?;
        // Entries committed after this read belong to the next pull.
        let server_version = self.store.current_version().await?;
        let mut changes = self
            .store
            .changes_since(since_version, actor.user_id)
            .await?;
        changes.retain(|e| e.server_version <= server_version);

        tracing::debug!(
            actor_id = actor.user_id,
            since_version,
            returned = changes.len(),
            server_version,
            "Pull served"
        );
        Ok(PullResult {
            changes,
            server_version,
        })
    }

    /// Current version and how many entries a pull from `since_version`
    /// would return. Read-only.
    pub async fn status(&self, actor: &Actor, since_version: i64) -> Result<SyncStatus, CoreError> {
        self.authorizer.require(actor, Capability::SyncData)?;
        let server_version = self.store.current_version().await?;
        let pending_for_user = self
            .store
            .count_changes_since(since_version, actor.user_id)
            .await?;
        Ok(SyncStatus {
            server_version,
            pending_for_user,
        })
    }
}
