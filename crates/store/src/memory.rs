//! In-memory [`Store`] backend.
//!
//! A single async mutex guards all state. A [`MemoryTx`] owns the guard for
//! its whole lifetime, so transactions are fully serialised, and carries a
//! snapshot that is restored if the transaction is dropped uncommitted.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pilelog_core::activity::ActivityStatus;
use pilelog_core::consumption::referenced_equipment;
use pilelog_core::hold_point::HoldPointStatus;
use pilelog_core::roles::{ROLE_ADMIN, ROLE_SUPERVISOR};
use pilelog_core::sync::IdempotencyKey;
use pilelog_core::types::DbId;

use crate::error::StoreError;
use crate::record::{
    Activity, ChangeLogEntry, DeductionOutcome, Equipment, HoldPoint, Material,
    MaterialDeduction, NewChangeLogEntry, NewHoldPoint, StockMovement, MOVEMENT_DEDUCT,
};
use crate::traits::Store;

#[derive(Debug, Clone)]
struct MemoryUser {
    role: String,
    site_ids: Vec<DbId>,
    active: bool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    version: i64,
    log: Vec<ChangeLogEntry>,
    ledger: HashSet<IdempotencyKey>,
    activities: BTreeMap<String, Activity>,
    hold_points: BTreeMap<DbId, HoldPoint>,
    materials: BTreeMap<DbId, Material>,
    stock_history: Vec<StockMovement>,
    equipment: BTreeMap<DbId, Equipment>,
    users: BTreeMap<DbId, MemoryUser>,
    next_id: DbId,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn hold_points_of(&self, activity_id: &str) -> Vec<HoldPoint> {
        let mut hps: Vec<HoldPoint> = self
            .hold_points
            .values()
            .filter(|hp| hp.activity_id == activity_id)
            .cloned()
            .collect();
        hps.sort_by_key(|hp| hp.hold_point_type);
        hps
    }
}

/// Shared-state store for tests and local tooling. Cloning shares state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

/// An open transaction on a [`MemoryStore`]. Rolls back on drop.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_material(
        &self,
        site_id: DbId,
        name: &str,
        unit: &str,
        current_stock: f64,
        minimum_stock: f64,
    ) -> Material {
        let mut state = self.state.lock().await;
        let material = Material {
            id: state.next_id(),
            site_id,
            name: name.to_string(),
            unit: unit.to_string(),
            current_stock,
            minimum_stock,
        };
        state.materials.insert(material.id, material.clone());
        material
    }

    pub async fn seed_equipment(&self, site_id: DbId, name: &str) -> Equipment {
        let mut state = self.state.lock().await;
        let equipment = Equipment {
            id: state.next_id(),
            site_id,
            name: name.to_string(),
            usage_hours: 0.0,
            productive_hours: 0.0,
            downtime_hours: 0.0,
        };
        state.equipment.insert(equipment.id, equipment.clone());
        equipment
    }

    /// Register a user with a role and site assignments.
    pub async fn seed_user(&self, user_id: DbId, role: &str, site_ids: &[DbId]) {
        let mut state = self.state.lock().await;
        state.users.insert(
            user_id,
            MemoryUser {
                role: role.to_string(),
                site_ids: site_ids.to_vec(),
                active: true,
            },
        );
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = Some(guard.clone());
        Ok(MemoryTx { guard, snapshot })
    }

    async fn commit(&self, mut tx: MemoryTx) -> Result<(), StoreError> {
        tx.snapshot = None;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ledger_contains(
        &self,
        tx: &mut MemoryTx,
        key: &IdempotencyKey,
    ) -> Result<bool, StoreError> {
        Ok(tx.guard.ledger.contains(key))
    }

    async fn ledger_record(
        &self,
        tx: &mut MemoryTx,
        key: &IdempotencyKey,
        _actor_id: DbId,
    ) -> Result<(), StoreError> {
        if !tx.guard.ledger.insert(key.clone()) {
            return Err(StoreError::Duplicate(format!("ledger key {key}")));
        }
        Ok(())
    }

    async fn append_change(
        &self,
        tx: &mut MemoryTx,
        entry: NewChangeLogEntry,
    ) -> Result<ChangeLogEntry, StoreError> {
        let state = &mut *tx.guard;
        state.version += 1;
        let entry = ChangeLogEntry {
            server_version: state.version,
            actor_id: entry.actor_id,
            client_change_id: entry.client_change_id,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            payload: entry.payload,
            applied_at: Utc::now(),
        };
        state.log.push(entry.clone());
        Ok(entry)
    }

    async fn current_version(&self) -> Result<i64, StoreError> {
        Ok(self.state.lock().await.version)
    }

    async fn changes_since(
        &self,
        since: i64,
        exclude_actor: DbId,
    ) -> Result<Vec<ChangeLogEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .log
            .iter()
            .filter(|e| e.server_version > since && e.actor_id != exclude_actor)
            .cloned()
            .collect())
    }

    async fn count_changes_since(&self, since: i64, exclude_actor: DbId) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let count = state
            .log
            .iter()
            .filter(|e| e.server_version > since && e.actor_id != exclude_actor)
            .count();
        Ok(count as i64)
    }

    async fn lock_activity(
        &self,
        tx: &mut MemoryTx,
        id: &str,
    ) -> Result<Option<Activity>, StoreError> {
        Ok(tx.guard.activities.get(id).cloned())
    }

    async fn find_activity_by_client_change(
        &self,
        tx: &mut MemoryTx,
        client_change_id: &str,
    ) -> Result<Option<Activity>, StoreError> {
        Ok(tx
            .guard
            .activities
            .values()
            .find(|a| a.client_change_id.as_deref() == Some(client_change_id))
            .cloned())
    }

    async fn insert_activity(
        &self,
        tx: &mut MemoryTx,
        activity: &Activity,
    ) -> Result<Activity, StoreError> {
        if tx.guard.activities.contains_key(&activity.id) {
            return Err(StoreError::Duplicate(format!("activity {}", activity.id)));
        }
        tx.guard
            .activities
            .insert(activity.id.clone(), activity.clone());
        Ok(activity.clone())
    }

    async fn update_activity(
        &self,
        tx: &mut MemoryTx,
        activity: &Activity,
    ) -> Result<Activity, StoreError> {
        let conflict = || StoreError::VersionConflict {
            entity: "activity",
            id: activity.id.clone(),
            expected: activity.version,
        };
        let stored = tx
            .guard
            .activities
            .get_mut(&activity.id)
            .filter(|a| a.is_active())
            .ok_or_else(conflict)?;
        if stored.version != activity.version {
            return Err(conflict());
        }
        let mut updated = activity.clone();
        updated.version += 1;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    async fn soft_delete_activity(&self, tx: &mut MemoryTx, id: &str) -> Result<bool, StoreError> {
        match tx.guard.activities.get_mut(id) {
            Some(a) if a.is_active() => {
                let now = Utc::now();
                a.deleted_at = Some(now);
                a.updated_at = now;
                a.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_activity(&self, id: &str) -> Result<Option<Activity>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.activities.get(id).filter(|a| a.is_active()).cloned())
    }

    async fn approved_activities_using_equipment(
        &self,
        equipment_id: DbId,
    ) -> Result<Vec<Activity>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .activities
            .values()
            .filter(|a| a.is_active() && a.status == ActivityStatus::Approved)
            .filter(|a| referenced_equipment(&a.details).contains(&equipment_id))
            .cloned()
            .collect())
    }

    async fn insert_hold_points(
        &self,
        tx: &mut MemoryTx,
        hold_points: Vec<NewHoldPoint>,
    ) -> Result<Vec<HoldPoint>, StoreError> {
        let state = &mut *tx.guard;
        let now = Utc::now();
        let mut created = Vec::with_capacity(hold_points.len());
        for new in hold_points {
            let duplicate = state.hold_points.values().any(|hp| {
                hp.activity_id == new.activity_id && hp.hold_point_type == new.hold_point_type
            });
            if duplicate {
                return Err(StoreError::Duplicate(format!(
                    "hold point {} for activity {}",
                    new.hold_point_type, new.activity_id
                )));
            }
            let hp = HoldPoint {
                id: state.next_id(),
                activity_id: new.activity_id,
                hold_point_type: new.hold_point_type,
                status: HoldPointStatus::Pending,
                checklist: new.checklist,
                signed_by_name: None,
                signed_by_id: None,
                signed_at: None,
                signature_data: None,
                comments: None,
                rejection_notes: None,
                rejected_by_id: None,
                rejected_at: None,
                created_at: now,
                updated_at: now,
            };
            state.hold_points.insert(hp.id, hp.clone());
            created.push(hp);
        }
        created.sort_by_key(|hp| hp.hold_point_type);
        Ok(created)
    }

    async fn hold_points_in_tx(
        &self,
        tx: &mut MemoryTx,
        activity_id: &str,
    ) -> Result<Vec<HoldPoint>, StoreError> {
        Ok(tx.guard.hold_points_of(activity_id))
    }

    async fn list_hold_points(&self, activity_id: &str) -> Result<Vec<HoldPoint>, StoreError> {
        Ok(self.state.lock().await.hold_points_of(activity_id))
    }

    async fn get_hold_point(
        &self,
        tx: &mut MemoryTx,
        id: DbId,
    ) -> Result<Option<HoldPoint>, StoreError> {
        Ok(tx.guard.hold_points.get(&id).cloned())
    }

    async fn decide_hold_point(
        &self,
        tx: &mut MemoryTx,
        hold_point: &HoldPoint,
    ) -> Result<Option<HoldPoint>, StoreError> {
        match tx.guard.hold_points.get_mut(&hold_point.id) {
            Some(stored) if stored.status == HoldPointStatus::Pending => {
                *stored = hold_point.clone();
                stored.updated_at = Utc::now();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn site_materials(&self, site_id: DbId) -> Result<Vec<Material>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .materials
            .values()
            .filter(|m| m.site_id == site_id)
            .cloned()
            .collect())
    }

    async fn get_material(&self, id: DbId) -> Result<Option<Material>, StoreError> {
        Ok(self.state.lock().await.materials.get(&id).cloned())
    }

    async fn deduct_material(
        &self,
        deduction: &MaterialDeduction,
    ) -> Result<DeductionOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let already = state.stock_history.iter().any(|m| {
            m.material_id == deduction.material_id
                && m.movement_type == MOVEMENT_DEDUCT
                && m.activity_id.as_deref() == Some(deduction.activity_id.as_str())
        });
        if already {
            return Ok(DeductionOutcome::AlreadyDeducted);
        }
        let movement_id = state.next_id();
        let material = state
            .materials
            .get_mut(&deduction.material_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "material",
                id: deduction.material_id.to_string(),
            })?;
        if material.current_stock < deduction.quantity {
            return Ok(DeductionOutcome::InsufficientStock {
                available: material.current_stock,
            });
        }
        material.current_stock -= deduction.quantity;
        let updated = material.clone();
        state.stock_history.push(StockMovement {
            id: movement_id,
            material_id: deduction.material_id,
            movement_type: MOVEMENT_DEDUCT.to_string(),
            quantity: -deduction.quantity,
            resulting_stock: updated.current_stock,
            activity_id: Some(deduction.activity_id.clone()),
            actor_id: Some(deduction.actor_id),
            note: deduction.note.clone(),
            created_at: Utc::now(),
        });
        Ok(DeductionOutcome::Deducted(updated))
    }

    async fn stock_history(&self, material_id: DbId) -> Result<Vec<StockMovement>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .stock_history
            .iter()
            .filter(|m| m.material_id == material_id)
            .cloned()
            .collect())
    }

    async fn get_equipment(&self, id: DbId) -> Result<Option<Equipment>, StoreError> {
        Ok(self.state.lock().await.equipment.get(&id).cloned())
    }

    async fn set_equipment_usage(
        &self,
        id: DbId,
        total_hours: f64,
        productive_hours: f64,
        downtime_hours: f64,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(equipment) = state.equipment.get_mut(&id) else {
            return Ok(false);
        };
        equipment.usage_hours = total_hours;
        equipment.productive_hours = productive_hours;
        equipment.downtime_hours = downtime_hours;
        Ok(true)
    }

    async fn site_alert_recipients(&self, site_id: DbId) -> Result<Vec<DbId>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .filter(|(_, u)| u.active)
            .filter(|(_, u)| {
                u.role == ROLE_ADMIN || (u.role == ROLE_SUPERVISOR && u.site_ids.contains(&site_id))
            })
            .map(|(id, _)| *id)
            .collect())
    }
}
