//! Mutation appliers: per-entity-type strategies turning a pushed change into
//! a state mutation inside the caller's transaction.
//!
//! An applier writes only its target entity. The sync service records the
//! ledger key and appends the change log entry in the same transaction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use pilelog_core::activity::{ensure_deletable, ensure_editable, ActivityStatus};
use pilelog_core::error::CoreError;
use pilelog_core::patch::{ActivityPatch, CreateActivity};
use pilelog_core::sync::{ChangeAction, SyncChange, ENTITY_ACTIVITY};
use pilelog_core::types::{DbId, Timestamp};
use pilelog_store::{Activity, Store};

use crate::workflow::ensure_creator;

/// Per-change context handed to appliers.
#[derive(Debug, Clone)]
pub struct ApplyContext {
    pub actor_id: DbId,
    pub enforce_edit_lock: bool,
    pub now: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// State changed; the change must be logged.
    Applied,
    /// Target state already reflects the change; nothing written.
    AlreadyApplied,
}

#[async_trait]
pub trait MutationApplier<S: Store>: Send + Sync {
    /// The `entityType` this applier handles.
    fn entity_type(&self) -> &'static str;

    async fn apply(
        &self,
        store: &S,
        tx: &mut S::Tx,
        ctx: &ApplyContext,
        change: &SyncChange,
    ) -> Result<ApplyOutcome, CoreError>;
}

/// `entityType -> applier` dispatch table.
pub struct ApplierRegistry<S: Store> {
    appliers: HashMap<&'static str, Arc<dyn MutationApplier<S>>>,
}

impl<S: Store> Default for ApplierRegistry<S> {
    fn default() -> Self {
        Self {
            appliers: HashMap::new(),
        }
    }
}

impl<S: Store> ApplierRegistry<S> {
    /// Registry with every built-in applier.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(ActivityApplier));
        registry
    }

    /// Register an applier, replacing any previous one for its entity type.
    pub fn register(&mut self, applier: Arc<dyn MutationApplier<S>>) {
        self.appliers.insert(applier.entity_type(), applier);
    }

    pub fn get(&self, entity_type: &str) -> Result<&Arc<dyn MutationApplier<S>>, CoreError> {
        self.appliers.get(entity_type).ok_or_else(|| {
            CoreError::Validation(format!("Unsupported entity type '{entity_type}'"))
        })
    }
}

// ---------------------------------------------------------------------------
// Activity applier
// ---------------------------------------------------------------------------

/// Applies CREATE/UPDATE/DELETE changes to activities.
pub struct ActivityApplier;

#[async_trait]
impl<S: Store> MutationApplier<S> for ActivityApplier {
    fn entity_type(&self) -> &'static str {
        ENTITY_ACTIVITY
    }

    async fn apply(
        &self,
        store: &S,
        tx: &mut S::Tx,
        ctx: &ApplyContext,
        change: &SyncChange,
    ) -> Result<ApplyOutcome, CoreError> {
        match change.action {
            ChangeAction::Create => create(store, tx, ctx, change).await,
            ChangeAction::Update => update(store, tx, ctx, change).await,
            ChangeAction::Delete => delete(store, tx, ctx, change).await,
        }
    }
}

async fn create<S: Store>(
    store: &S,
    tx: &mut S::Tx,
    ctx: &ApplyContext,
    change: &SyncChange,
) -> Result<ApplyOutcome, CoreError> {
    let mut input = CreateActivity::from_payload(&change.payload)?;
    let origin = input
        .client_change_id
        .take()
        .unwrap_or_else(|| change.client_change_id.clone());

    if let Some(existing) = store.find_activity_by_client_change(tx, &origin).await? {
        tracing::debug!(
            activity_id = %existing.id,
            client_change_id = %origin,
            "Activity already created by this client change"
        );
        return Ok(ApplyOutcome::AlreadyApplied);
    }
    if store.lock_activity(tx, &change.entity_id).await?.is_some() {
        return Err(CoreError::Conflict(format!(
            "Activity {} already exists",
            change.entity_id
        )));
    }

    input.client_change_id = Some(origin);
    let activity = Activity::new_draft(change.entity_id.clone(), ctx.actor_id, input, ctx.now)?;
    store.insert_activity(tx, &activity).await?;
    Ok(ApplyOutcome::Applied)
}

async fn update<S: Store>(
    store: &S,
    tx: &mut S::Tx,
    ctx: &ApplyContext,
    change: &SyncChange,
) -> Result<ApplyOutcome, CoreError> {
    let patch = ActivityPatch::from_payload(&change.payload)?;
    let mut activity = store
        .lock_activity(tx, &change.entity_id)
        .await?
        .filter(Activity::is_active)
        .ok_or_else(|| CoreError::not_found("activity", &change.entity_id))?;

    if ctx.enforce_edit_lock {
        ensure_creator(&activity, ctx.actor_id, "edit")?;
        ensure_editable(activity.status)?;
        activity.status = ActivityStatus::Draft;
    }
    activity.apply_patch(&patch)?;
    store.update_activity(tx, &activity).await?;
    Ok(ApplyOutcome::Applied)
}

async fn delete<S: Store>(
    store: &S,
    tx: &mut S::Tx,
    ctx: &ApplyContext,
    change: &SyncChange,
) -> Result<ApplyOutcome, CoreError> {
    let activity = store
        .lock_activity(tx, &change.entity_id)
        .await?
        .ok_or_else(|| CoreError::not_found("activity", &change.entity_id))?;
    if !activity.is_active() {
        return Ok(ApplyOutcome::AlreadyApplied);
    }

    if ctx.enforce_edit_lock {
        ensure_creator(&activity, ctx.actor_id, "delete")?;
        ensure_deletable(activity.status)?;
    }
    store.soft_delete_activity(tx, &activity.id).await?;
    Ok(ApplyOutcome::Applied)
}
