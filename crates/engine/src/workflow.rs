//! Interactive activity operations and the DRAFT → SUBMITTED →
//! APPROVED/REJECTED state machine.
//!
//! Every write is logged to the change log so pull replicates it.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use pilelog_core::activity::{
    ensure_deletable, ensure_editable, ActivityStatus, Transition,
};
use pilelog_core::error::CoreError;
use pilelog_core::hold_point::HoldPointStatus;
use pilelog_core::notify::{
    Notification, NotificationSink, KIND_ACTIVITY_APPROVED, KIND_ACTIVITY_REJECTED,
};
use pilelog_core::patch::{ActivityPatch, CreateActivity};
use pilelog_core::roles::{Actor, Authorizer, Capability};
use pilelog_core::sync::{ChangeAction, ENTITY_ACTIVITY};
use pilelog_core::types::DbId;
use pilelog_store::{Activity, Store};

use crate::effects::ApprovalEffects;
use crate::journal;

/// Only the creator may edit or delete an activity.
pub(crate) fn ensure_creator(activity: &Activity, actor_id: DbId, verb: &str) -> Result<(), CoreError> {
    if activity.created_by == actor_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "Only the creator can {verb} this activity"
        )))
    }
}

/// An interactive edit request.
#[derive(Debug, Clone, Default)]
pub struct EditActivity {
    pub patch: ActivityPatch,
    /// When set, the edit fails with `Conflict` unless the stored version matches.
    pub expected_version: Option<i64>,
}

impl EditActivity {
    /// Parse a request body: patch fields plus an optional `expectedVersion`.
    pub fn from_payload(payload: &Value) -> Result<Self, CoreError> {
        let patch = ActivityPatch::from_payload(payload)?;
        let expected_version = match payload.get("expectedVersion") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_i64().ok_or_else(|| {
                CoreError::Validation("Invalid 'expectedVersion': expected an integer".to_string())
            })?),
        };
        Ok(Self {
            patch,
            expected_version,
        })
    }
}

/// Result of [`ActivityWorkflow::create`].
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub activity: Activity,
    /// `false` when the client change id matched an existing activity.
    pub created: bool,
}

pub struct ActivityWorkflow<S: Store> {
    store: Arc<S>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn NotificationSink>,
    effects: ApprovalEffects<S>,
}

impl<S: Store> ActivityWorkflow<S> {
    pub fn new(
        store: Arc<S>,
        authorizer: Arc<dyn Authorizer>,
        notifier: Arc<dyn NotificationSink>,
        effects: ApprovalEffects<S>,
    ) -> Self {
        Self {
            store,
            authorizer,
            notifier,
            effects,
        }
    }

    /// Live activity by id.
    pub async fn get(&self, id: &str) -> Result<Activity, CoreError> {
        self.store
            .get_activity(id)
            .await?
            .ok_or_else(|| CoreError::not_found("activity", id))
    }

    /// Create a DRAFT activity with a server-generated id.
    ///
    /// A `clientChangeId` that already produced an activity returns that
    /// activity instead of creating another.
    pub async fn create(&self, actor: &Actor, input: CreateActivity) -> Result<CreateOutcome, CoreError> {
        self.authorizer.require(actor, Capability::EditActivity)?;

        let mut tx = self.store.begin().await?;
        if let Some(ccid) = &input.client_change_id {
            if let Some(existing) = self.store.find_activity_by_client_change(&mut tx, ccid).await? {
                if existing.is_active() {
                    return Ok(CreateOutcome {
                        activity: existing,
                        created: false,
                    });
                }
                return Err(CoreError::Conflict(format!(
                    "Client change {ccid} created an activity that has since been deleted"
                )));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let draft = Activity::new_draft(id, actor.user_id, input, Utc::now())?;
        let activity = self.store.insert_activity(&mut tx, &draft).await?;
        journal::record(
            self.store.as_ref(),
            &mut tx,
            actor.user_id,
            ChangeAction::Create,
            ENTITY_ACTIVITY,
            &activity.id,
            &activity,
        )
        .await?;
        self.store.commit(tx).await?;

        tracing::info!(
            actor_id = actor.user_id,
            activity_id = %activity.id,
            activity_type = %activity.activity_type,
            "Activity created"
        );
        Ok(CreateOutcome {
            activity,
            created: true,
        })
    }

    /// Creator-only content edit from DRAFT or REJECTED. Resets to DRAFT.
    pub async fn edit(&self, actor: &Actor, id: &str, edit: EditActivity) -> Result<Activity, CoreError> {
        self.authorizer.require(actor, Capability::EditActivity)?;
        if edit.patch.is_empty() {
            return Err(CoreError::Validation("No fields to update".to_string()));
        }

        let mut tx = self.store.begin().await?;
        let mut activity = self.lock_live(&mut tx, id).await?;
        ensure_creator(&activity, actor.user_id, "edit")?;
        ensure_editable(activity.status)?;
        if let Some(expected) = edit.expected_version {
            if expected != activity.version {
                return Err(CoreError::Conflict(format!(
                    "Activity {id} is at version {}, not {expected}",
                    activity.version
                )));
            }
        }

        activity.apply_patch(&edit.patch)?;
        activity.status = ActivityStatus::Draft;
        let activity = self.save(&mut tx, actor, activity, ChangeAction::Update).await?;
        self.store.commit(tx).await?;

        tracing::info!(
            actor_id = actor.user_id,
            activity_id = %activity.id,
            version = activity.version,
            "Activity edited"
        );
        Ok(activity)
    }

    /// DRAFT|REJECTED → SUBMITTED, by the creator or an admin.
    pub async fn submit(&self, actor: &Actor, id: &str) -> Result<Activity, CoreError> {
        self.authorizer.require(actor, Capability::EditActivity)?;

        let mut tx = self.store.begin().await?;
        let mut activity = self.lock_live(&mut tx, id).await?;
        if activity.created_by != actor.user_id
            && !self.authorizer.allows(actor, Capability::Admin)
        {
            return Err(CoreError::Forbidden(
                "Only the creator or an admin can submit this activity".to_string(),
            ));
        }
        activity.status = Transition::Submit.apply(activity.status)?;
        let activity = self.save(&mut tx, actor, activity, ChangeAction::Update).await?;
        self.store.commit(tx).await?;

        tracing::info!(actor_id = actor.user_id, activity_id = %activity.id, "Activity submitted");
        Ok(activity)
    }

    /// SUBMITTED → APPROVED, then run the post-approval effects.
    ///
    /// When the activity has hold points, all of them must be APPROVED.
    pub async fn approve(&self, actor: &Actor, id: &str) -> Result<Activity, CoreError> {
        self.authorizer.require(actor, Capability::ApproveActivity)?;

        let mut tx = self.store.begin().await?;
        let mut activity = self.lock_live(&mut tx, id).await?;
        activity.status = Transition::Approve.apply(activity.status)?;

        let hold_points = self.store.hold_points_in_tx(&mut tx, id).await?;
        if let Some(open) = hold_points
            .iter()
            .find(|hp| hp.status != HoldPointStatus::Approved)
        {
            return Err(CoreError::Validation(format!(
                "All hold points must be approved first: {} is {}",
                open.hold_point_type, open.status
            )));
        }

        activity.approved_by = Some(actor.user_id);
        activity.approved_at = Some(Utc::now());
        activity.rejection_notes = None;
        let activity = self.save(&mut tx, actor, activity, ChangeAction::Update).await?;
        self.store.commit(tx).await?;

        tracing::info!(actor_id = actor.user_id, activity_id = %activity.id, "Activity approved");

        self.effects.run(&activity, actor).await;
        self.notifier.notify(Notification {
            user_id: activity.created_by,
            kind: KIND_ACTIVITY_APPROVED.to_string(),
            title: "Activity approved".to_string(),
            message: format!(
                "Your {} activity of {} was approved",
                activity.activity_type, activity.activity_date
            ),
            data: json!({ "activityId": activity.id, "approvedBy": actor.user_id }),
        });
        Ok(activity)
    }

    /// SUBMITTED → REJECTED with mandatory notes.
    pub async fn reject(&self, actor: &Actor, id: &str, notes: &str) -> Result<Activity, CoreError> {
        self.authorizer.require(actor, Capability::ApproveActivity)?;
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(CoreError::Validation(
                "Rejection notes must not be empty".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let mut activity = self.lock_live(&mut tx, id).await?;
        activity.status = Transition::Reject.apply(activity.status)?;
        activity.rejection_notes = Some(notes.to_string());
        let activity = self.save(&mut tx, actor, activity, ChangeAction::Update).await?;
        self.store.commit(tx).await?;

        tracing::info!(actor_id = actor.user_id, activity_id = %activity.id, "Activity rejected");

        self.notifier.notify(Notification {
            user_id: activity.created_by,
            kind: KIND_ACTIVITY_REJECTED.to_string(),
            title: "Activity rejected".to_string(),
            message: format!(
                "Your {} activity of {} was rejected: {notes}",
                activity.activity_type, activity.activity_date
            ),
            data: json!({ "activityId": activity.id, "rejectedBy": actor.user_id }),
        });
        Ok(activity)
    }

    /// Creator-only soft delete of a non-APPROVED activity.
    pub async fn delete(&self, actor: &Actor, id: &str) -> Result<(), CoreError> {
        self.authorizer.require(actor, Capability::EditActivity)?;

        let mut tx = self.store.begin().await?;
        let activity = self.lock_live(&mut tx, id).await?;
        ensure_creator(&activity, actor.user_id, "delete")?;
        ensure_deletable(activity.status)?;

        self.store.soft_delete_activity(&mut tx, id).await?;
        journal::record(
            self.store.as_ref(),
            &mut tx,
            actor.user_id,
            ChangeAction::Delete,
            ENTITY_ACTIVITY,
            id,
            &json!({}),
        )
        .await?;
        self.store.commit(tx).await?;

        tracing::info!(actor_id = actor.user_id, activity_id = %id, "Activity deleted");
        Ok(())
    }

    async fn lock_live(&self, tx: &mut S::Tx, id: &str) -> Result<Activity, CoreError> {
        self.store
            .lock_activity(tx, id)
            .await?
            .filter(Activity::is_active)
            .ok_or_else(|| CoreError::not_found("activity", id))
    }

    /// Versioned write plus change log entry carrying the new snapshot.
    async fn save(
        &self,
        tx: &mut S::Tx,
        actor: &Actor,
        activity: Activity,
        action: ChangeAction,
    ) -> Result<Activity, CoreError> {
        let stored = self.store.update_activity(tx, &activity).await?;
        journal::record(
            self.store.as_ref(),
            tx,
            actor.user_id,
            action,
            ENTITY_ACTIVITY,
            &stored.id,
            &stored,
        )
        .await?;
        Ok(stored)
    }
}
