//! [`Store`] implementation over PostgreSQL.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use pilelog_core::sync::IdempotencyKey;
use pilelog_core::types::DbId;
use pilelog_store::{
    Activity, ChangeLogEntry, DeductionOutcome, Equipment, HoldPoint, Material,
    MaterialDeduction, NewChangeLogEntry, NewHoldPoint, StockMovement, Store, StoreError,
};

use crate::models::activity::ActivityRow;
use crate::models::hold_point::HoldPointRow;
use crate::repositories::{
    ActivityRepo, ChangeLogRepo, DeductResult, EquipmentRepo, HoldPointRepo, MaterialRepo,
    SyncLedgerRepo, UserRepo,
};
use crate::DbPool;

/// Map a driver error, surfacing unique violations as duplicates.
fn db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(db.message().to_string());
        }
    }
    StoreError::Backend(err.to_string())
}

fn activities(rows: Vec<ActivityRow>) -> Result<Vec<Activity>, StoreError> {
    rows.into_iter().map(ActivityRow::into_record).collect()
}

fn hold_points(rows: Vec<HoldPointRow>) -> Result<Vec<HoldPoint>, StoreError> {
    rows.into_iter().map(HoldPointRow::into_record).collect()
}

/// PostgreSQL-backed store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.pool.begin().await.map_err(db_err)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.commit().await.map_err(db_err)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(db_err)
    }

    async fn ledger_contains(
        &self,
        tx: &mut Self::Tx,
        key: &IdempotencyKey,
    ) -> Result<bool, StoreError> {
        SyncLedgerRepo::lock_key(&mut **tx, key)
            .await
            .map_err(db_err)?;
        SyncLedgerRepo::exists(&mut **tx, key).await.map_err(db_err)
    }

    async fn ledger_record(
        &self,
        tx: &mut Self::Tx,
        key: &IdempotencyKey,
        actor_id: DbId,
    ) -> Result<(), StoreError> {
        SyncLedgerRepo::insert(&mut **tx, key, actor_id)
            .await
            .map_err(db_err)
    }

    async fn append_change(
        &self,
        tx: &mut Self::Tx,
        entry: NewChangeLogEntry,
    ) -> Result<ChangeLogEntry, StoreError> {
        let version = ChangeLogRepo::next_version(&mut **tx).await.map_err(db_err)?;
        ChangeLogRepo::insert(&mut **tx, version, &entry)
            .await
            .map_err(db_err)?
            .into_record()
    }

    async fn current_version(&self) -> Result<i64, StoreError> {
        ChangeLogRepo::current_version(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn changes_since(
        &self,
        since: i64,
        exclude_actor: DbId,
    ) -> Result<Vec<ChangeLogEntry>, StoreError> {
        ChangeLogRepo::list_since(&self.pool, since, exclude_actor)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|row| row.into_record())
            .collect()
    }

    async fn count_changes_since(&self, since: i64, exclude_actor: DbId) -> Result<i64, StoreError> {
        ChangeLogRepo::count_since(&self.pool, since, exclude_actor)
            .await
            .map_err(db_err)
    }

    async fn lock_activity(
        &self,
        tx: &mut Self::Tx,
        id: &str,
    ) -> Result<Option<Activity>, StoreError> {
        ActivityRepo::find_for_update(&mut **tx, id)
            .await
            .map_err(db_err)?
            .map(ActivityRow::into_record)
            .transpose()
    }

    async fn find_activity_by_client_change(
        &self,
        tx: &mut Self::Tx,
        client_change_id: &str,
    ) -> Result<Option<Activity>, StoreError> {
        ActivityRepo::find_by_client_change_id(&mut **tx, client_change_id)
            .await
            .map_err(db_err)?
            .map(ActivityRow::into_record)
            .transpose()
    }

    async fn insert_activity(
        &self,
        tx: &mut Self::Tx,
        activity: &Activity,
    ) -> Result<Activity, StoreError> {
        ActivityRepo::insert(&mut **tx, activity)
            .await
            .map_err(db_err)?
            .into_record()
    }

    async fn update_activity(
        &self,
        tx: &mut Self::Tx,
        activity: &Activity,
    ) -> Result<Activity, StoreError> {
        match ActivityRepo::update_versioned(&mut **tx, activity)
            .await
            .map_err(db_err)?
        {
            Some(row) => row.into_record(),
            None => Err(StoreError::VersionConflict {
                entity: "activity",
                id: activity.id.clone(),
                expected: activity.version,
            }),
        }
    }

    async fn soft_delete_activity(&self, tx: &mut Self::Tx, id: &str) -> Result<bool, StoreError> {
        ActivityRepo::soft_delete(&mut **tx, id)
            .await
            .map_err(db_err)
    }

    async fn get_activity(&self, id: &str) -> Result<Option<Activity>, StoreError> {
        ActivityRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?
            .map(ActivityRow::into_record)
            .transpose()
    }

    async fn approved_activities_using_equipment(
        &self,
        equipment_id: DbId,
    ) -> Result<Vec<Activity>, StoreError> {
        let rows = ActivityRepo::list_approved_using_equipment(&self.pool, equipment_id)
            .await
            .map_err(db_err)?;
        activities(rows)
    }

    async fn insert_hold_points(
        &self,
        tx: &mut Self::Tx,
        new: Vec<NewHoldPoint>,
    ) -> Result<Vec<HoldPoint>, StoreError> {
        let mut created = Vec::with_capacity(new.len());
        for input in &new {
            let row = HoldPointRepo::insert(&mut **tx, input)
                .await
                .map_err(db_err)?;
            created.push(row.into_record()?);
        }
        created.sort_by_key(|hp| hp.hold_point_type);
        Ok(created)
    }

    async fn hold_points_in_tx(
        &self,
        tx: &mut Self::Tx,
        activity_id: &str,
    ) -> Result<Vec<HoldPoint>, StoreError> {
        let rows = HoldPointRepo::list_for_activity(&mut **tx, activity_id)
            .await
            .map_err(db_err)?;
        hold_points(rows)
    }

    async fn list_hold_points(&self, activity_id: &str) -> Result<Vec<HoldPoint>, StoreError> {
        let rows = HoldPointRepo::list_for_activity(&self.pool, activity_id)
            .await
            .map_err(db_err)?;
        hold_points(rows)
    }

    async fn get_hold_point(
        &self,
        tx: &mut Self::Tx,
        id: DbId,
    ) -> Result<Option<HoldPoint>, StoreError> {
        HoldPointRepo::find_for_update(&mut **tx, id)
            .await
            .map_err(db_err)?
            .map(HoldPointRow::into_record)
            .transpose()
    }

    async fn decide_hold_point(
        &self,
        tx: &mut Self::Tx,
        hold_point: &HoldPoint,
    ) -> Result<Option<HoldPoint>, StoreError> {
        HoldPointRepo::decide(&mut **tx, hold_point)
            .await
            .map_err(db_err)?
            .map(HoldPointRow::into_record)
            .transpose()
    }

    async fn site_materials(&self, site_id: DbId) -> Result<Vec<Material>, StoreError> {
        let rows = MaterialRepo::list_for_site(&self.pool, site_id)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Material::from).collect())
    }

    async fn get_material(&self, id: DbId) -> Result<Option<Material>, StoreError> {
        let row = MaterialRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?;
        Ok(row.map(Material::from))
    }

    async fn deduct_material(
        &self,
        deduction: &MaterialDeduction,
    ) -> Result<DeductionOutcome, StoreError> {
        let result = match MaterialRepo::deduct(&self.pool, deduction).await {
            Ok(result) => result,
            // A concurrent deduction for the same activity won the unique index.
            Err(e) => match db_err(e) {
                StoreError::Duplicate(_) => DeductResult::AlreadyDeducted,
                other => return Err(other),
            },
        };
        match result {
            DeductResult::Deducted(row) => Ok(DeductionOutcome::Deducted(row.into())),
            DeductResult::AlreadyDeducted => Ok(DeductionOutcome::AlreadyDeducted),
            DeductResult::InsufficientStock { available } => {
                Ok(DeductionOutcome::InsufficientStock { available })
            }
            DeductResult::MaterialNotFound => Err(StoreError::NotFound {
                entity: "material",
                id: deduction.material_id.to_string(),
            }),
        }
    }

    async fn stock_history(&self, material_id: DbId) -> Result<Vec<StockMovement>, StoreError> {
        let rows = MaterialRepo::history(&self.pool, material_id)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(StockMovement::from).collect())
    }

    async fn get_equipment(&self, id: DbId) -> Result<Option<Equipment>, StoreError> {
        let row = EquipmentRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?;
        Ok(row.map(Equipment::from))
    }

    async fn set_equipment_usage(
        &self,
        id: DbId,
        total_hours: f64,
        productive_hours: f64,
        downtime_hours: f64,
    ) -> Result<bool, StoreError> {
        EquipmentRepo::set_usage(&self.pool, id, total_hours, productive_hours, downtime_hours)
            .await
            .map_err(db_err)
    }

    async fn site_alert_recipients(&self, site_id: DbId) -> Result<Vec<DbId>, StoreError> {
        UserRepo::alert_recipients(&self.pool, site_id)
            .await
            .map_err(db_err)
    }
}
