//! Hold-point gate: the three sequential inspection sign-offs on an activity.

use std::sync::Arc;

use chrono::Utc;

use pilelog_core::error::CoreError;
use pilelog_core::hold_point::{
    ensure_pending, ensure_previous_approved, HoldPointStatus, SignOff, HOLD_POINT_SEQUENCE,
};
use pilelog_core::roles::{Actor, Authorizer, Capability};
use pilelog_core::sync::{ChangeAction, ENTITY_HOLD_POINT};
use pilelog_core::types::DbId;
use pilelog_store::{Activity, HoldPoint, NewHoldPoint, Store};

use crate::journal;

pub struct HoldPointGate<S: Store> {
    store: Arc<S>,
    authorizer: Arc<dyn Authorizer>,
}

impl<S: Store> HoldPointGate<S> {
    pub fn new(store: Arc<S>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { store, authorizer }
    }

    /// Hold points of a live activity, in signing order.
    pub async fn list(&self, activity_id: &str) -> Result<Vec<HoldPoint>, CoreError> {
        if self.store.get_activity(activity_id).await?.is_none() {
            return Err(CoreError::not_found("activity", activity_id));
        }
        Ok(self.store.list_hold_points(activity_id).await?)
    }

    /// Create the three PENDING stages with default checklists.
    ///
    /// Idempotent: if any hold points exist they are returned unchanged, with
    /// `false` as the second element.
    pub async fn create_for_activity(
        &self,
        actor: &Actor,
        activity_id: &str,
    ) -> Result<(Vec<HoldPoint>, bool), CoreError> {
        self.authorizer.require(actor, Capability::EditActivity)?;

        let mut tx = self.store.begin().await?;
        self.lock_live_activity(&mut tx, activity_id).await?;
        let existing = self.store.hold_points_in_tx(&mut tx, activity_id).await?;
        if !existing.is_empty() {
            return Ok((existing, false));
        }

        let new = HOLD_POINT_SEQUENCE
            .iter()
            .map(|kind| NewHoldPoint {
                activity_id: activity_id.to_string(),
                hold_point_type: *kind,
                checklist: kind.default_checklist(),
            })
            .collect();
        let created = self.store.insert_hold_points(&mut tx, new).await?;
        for hp in &created {
            journal::record(
                self.store.as_ref(),
                &mut tx,
                actor.user_id,
                ChangeAction::Create,
                ENTITY_HOLD_POINT,
                &hp.id.to_string(),
                hp,
            )
            .await?;
        }
        self.store.commit(tx).await?;

        tracing::info!(actor_id = actor.user_id, activity_id, "Hold points created");
        Ok((created, true))
    }

    /// PENDING → APPROVED, once the preceding stage is APPROVED.
    pub async fn sign(&self, actor: &Actor, id: DbId, sign_off: SignOff) -> Result<HoldPoint, CoreError> {
        self.authorizer.require(actor, Capability::SignHoldPoint)?;
        sign_off.validate()?;

        let mut tx = self.store.begin().await?;
        let mut hp = self.load(&mut tx, id).await?;
        ensure_pending(hp.status)?;

        let siblings = self.store.hold_points_in_tx(&mut tx, &hp.activity_id).await?;
        let previous = hp.hold_point_type.previous().map(|prev| {
            siblings
                .iter()
                .find(|s| s.hold_point_type == prev)
                .map(|s| s.status)
        });
        ensure_previous_approved(hp.hold_point_type, previous.flatten())?;

        if let Some(checklist) = sign_off.checklist {
            hp.checklist = checklist;
        }
        hp.status = HoldPointStatus::Approved;
        hp.signed_by_name = Some(sign_off.signed_by_name);
        hp.signed_by_id = Some(actor.user_id);
        hp.signed_at = Some(Utc::now());
        hp.signature_data = sign_off.signature_data;
        hp.comments = sign_off.comments;

        let hp = self.decide(&mut tx, actor, &hp).await?;
        self.store.commit(tx).await?;

        tracing::info!(
            actor_id = actor.user_id,
            hold_point_id = id,
            activity_id = %hp.activity_id,
            hold_point_type = %hp.hold_point_type,
            "Hold point signed"
        );
        Ok(hp)
    }

    /// PENDING → REJECTED with mandatory notes. Terminal.
    pub async fn reject(&self, actor: &Actor, id: DbId, notes: &str) -> Result<HoldPoint, CoreError> {
        self.authorizer.require(actor, Capability::SignHoldPoint)?;
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(CoreError::Validation(
                "Rejection notes must not be empty".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let mut hp = self.load(&mut tx, id).await?;
        ensure_pending(hp.status)?;

        hp.status = HoldPointStatus::Rejected;
        hp.rejection_notes = Some(notes.to_string());
        hp.rejected_by_id = Some(actor.user_id);
        hp.rejected_at = Some(Utc::now());

        let hp = self.decide(&mut tx, actor, &hp).await?;
        self.store.commit(tx).await?;

        tracing::info!(
            actor_id = actor.user_id,
            hold_point_id = id,
            activity_id = %hp.activity_id,
            hold_point_type = %hp.hold_point_type,
            "Hold point rejected"
        );
        Ok(hp)
    }

    async fn lock_live_activity(&self, tx: &mut S::Tx, activity_id: &str) -> Result<Activity, CoreError> {
        self.store
            .lock_activity(tx, activity_id)
            .await?
            .filter(Activity::is_active)
            .ok_or_else(|| CoreError::not_found("activity", activity_id))
    }

    /// Load a hold point whose activity is still live.
    async fn load(&self, tx: &mut S::Tx, id: DbId) -> Result<HoldPoint, CoreError> {
        let hp = self
            .store
            .get_hold_point(tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("hold point", id))?;
        self.lock_live_activity(tx, &hp.activity_id).await?;
        Ok(hp)
    }

    /// Conditional write; exactly one concurrent decision wins.
    async fn decide(&self, tx: &mut S::Tx, actor: &Actor, hp: &HoldPoint) -> Result<HoldPoint, CoreError> {
        let stored = self.store.decide_hold_point(tx, hp).await?.ok_or_else(|| {
            CoreError::Validation("Hold point was already decided by another user".to_string())
        })?;
        journal::record(
            self.store.as_ref(),
            tx,
            actor.user_id,
            ChangeAction::Update,
            ENTITY_HOLD_POINT,
            &stored.id.to_string(),
            &stored,
        )
        .await?;
        Ok(stored)
    }
}
