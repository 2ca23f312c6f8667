use async_trait::async_trait;

use pilelog_core::sync::IdempotencyKey;
use pilelog_core::types::DbId;

use crate::error::StoreError;
use crate::record::{
    Activity, ChangeLogEntry, DeductionOutcome, Equipment, HoldPoint, Material,
    MaterialDeduction, NewChangeLogEntry, NewHoldPoint, StockMovement,
};

/// Durable, transactional storage for the sync engine and the activity
/// workflow.
///
/// ## Transactions
///
/// Mutating operations take `&mut Self::Tx`. The lifecycle is:
///
/// 1. `begin()` starts a transaction
/// 2. call mutating methods with `&mut tx`
/// 3. `commit(tx)` makes all mutations durable
///
/// A `Tx` dropped without `commit` MUST roll back. Methods without a `tx`
/// argument read committed state and must not be called while the same
/// task holds an open `Tx` (the in-memory backend would deadlock).
///
/// ## Versions
///
/// `append_change` assigns the next `server_version` inside the caller's
/// transaction. Versions become visible in commit order, strictly
/// increasing, and a rolled-back transaction consumes no version.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: Send;

    // ── Transaction lifecycle ────────────────────────────────────────────────

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    /// Liveness check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    // ── Idempotency ledger (within tx) ───────────────────────────────────────

    /// Whether `key` was already applied. Serialises concurrent holders of
    /// the same key until the transaction ends.
    async fn ledger_contains(
        &self,
        tx: &mut Self::Tx,
        key: &IdempotencyKey,
    ) -> Result<bool, StoreError>;

    /// Record `key` as applied, attributed to `actor_id`.
    async fn ledger_record(
        &self,
        tx: &mut Self::Tx,
        key: &IdempotencyKey,
        actor_id: DbId,
    ) -> Result<(), StoreError>;

    // ── Change log ───────────────────────────────────────────────────────────

    /// Append an entry, assigning the next server version.
    async fn append_change(
        &self,
        tx: &mut Self::Tx,
        entry: NewChangeLogEntry,
    ) -> Result<ChangeLogEntry, StoreError>;

    /// Highest committed server version (0 for an empty log).
    async fn current_version(&self) -> Result<i64, StoreError>;

    /// Entries with `server_version > since` not written by `exclude_actor`,
    /// ascending.
    async fn changes_since(
        &self,
        since: i64,
        exclude_actor: DbId,
    ) -> Result<Vec<ChangeLogEntry>, StoreError>;

    /// Count of what [`changes_since`](Store::changes_since) would return.
    async fn count_changes_since(&self, since: i64, exclude_actor: DbId)
        -> Result<i64, StoreError>;

    // ── Activities ───────────────────────────────────────────────────────────

    /// Read an activity for update, soft-deleted rows included. The row stays
    /// locked until the transaction ends.
    async fn lock_activity(
        &self,
        tx: &mut Self::Tx,
        id: &str,
    ) -> Result<Option<Activity>, StoreError>;

    /// Find an activity (soft-deleted included) by the client change that
    /// created it.
    async fn find_activity_by_client_change(
        &self,
        tx: &mut Self::Tx,
        client_change_id: &str,
    ) -> Result<Option<Activity>, StoreError>;

    /// Returns `Err(StoreError::Duplicate)` if the id is taken.
    async fn insert_activity(
        &self,
        tx: &mut Self::Tx,
        activity: &Activity,
    ) -> Result<Activity, StoreError>;

    /// Compare-and-swap write: succeeds only if the stored version equals
    /// `activity.version`, and stores `version + 1`.
    ///
    /// Returns `Err(StoreError::VersionConflict)` otherwise.
    async fn update_activity(
        &self,
        tx: &mut Self::Tx,
        activity: &Activity,
    ) -> Result<Activity, StoreError>;

    /// Set the tombstone. Returns `false` if already deleted or absent.
    async fn soft_delete_activity(&self, tx: &mut Self::Tx, id: &str)
        -> Result<bool, StoreError>;

    /// Live activity by id.
    async fn get_activity(&self, id: &str) -> Result<Option<Activity>, StoreError>;

    /// Live APPROVED activities whose `equipmentUsed` references `equipment_id`.
    async fn approved_activities_using_equipment(
        &self,
        equipment_id: DbId,
    ) -> Result<Vec<Activity>, StoreError>;

    // ── Hold points ──────────────────────────────────────────────────────────

    async fn insert_hold_points(
        &self,
        tx: &mut Self::Tx,
        hold_points: Vec<NewHoldPoint>,
    ) -> Result<Vec<HoldPoint>, StoreError>;

    /// Hold points of an activity in signing order, read inside `tx`.
    async fn hold_points_in_tx(
        &self,
        tx: &mut Self::Tx,
        activity_id: &str,
    ) -> Result<Vec<HoldPoint>, StoreError>;

    /// Hold points of an activity in signing order.
    async fn list_hold_points(&self, activity_id: &str) -> Result<Vec<HoldPoint>, StoreError>;

    async fn get_hold_point(
        &self,
        tx: &mut Self::Tx,
        id: DbId,
    ) -> Result<Option<HoldPoint>, StoreError>;

    /// Persist a signed or rejected hold point, conditional on the stored
    /// status still being PENDING. Returns the stored row, or `None` if
    /// another decision won.
    async fn decide_hold_point(
        &self,
        tx: &mut Self::Tx,
        hold_point: &HoldPoint,
    ) -> Result<Option<HoldPoint>, StoreError>;

    // ── Materials and equipment ──────────────────────────────────────────────

    async fn site_materials(&self, site_id: DbId) -> Result<Vec<Material>, StoreError>;

    async fn get_material(&self, id: DbId) -> Result<Option<Material>, StoreError>;

    /// Atomically decrement stock and append a DEDUCT movement, at most once
    /// per (material, activity), never below zero.
    async fn deduct_material(
        &self,
        deduction: &MaterialDeduction,
    ) -> Result<DeductionOutcome, StoreError>;

    async fn stock_history(&self, material_id: DbId) -> Result<Vec<StockMovement>, StoreError>;

    async fn get_equipment(&self, id: DbId) -> Result<Option<Equipment>, StoreError>;

    /// Overwrite the usage totals. Returns `false` if the equipment is absent.
    async fn set_equipment_usage(
        &self,
        id: DbId,
        total_hours: f64,
        productive_hours: f64,
        downtime_hours: f64,
    ) -> Result<bool, StoreError>;

    // ── Users ────────────────────────────────────────────────────────────────

    /// Active users who receive site alerts: admins, plus supervisors
    /// assigned to `site_id`.
    async fn site_alert_recipients(&self, site_id: DbId) -> Result<Vec<DbId>, StoreError>;
}
