//! Repository for the `equipment` table.

use sqlx::PgPool;

use pilelog_core::types::DbId;

use crate::models::inventory::{CreateEquipment, EquipmentRow};

const COLUMNS: &str = "id, site_id, name, usage_hours, productive_hours, downtime_hours";

pub struct EquipmentRepo;

impl EquipmentRepo {
    pub async fn create(pool: &PgPool, input: &CreateEquipment) -> Result<EquipmentRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO equipment (site_id, name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EquipmentRow>(&query)
            .bind(input.site_id)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EquipmentRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM equipment WHERE id = $1");
        sqlx::query_as::<_, EquipmentRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the usage totals. Returns `false` if no row matched.
    pub async fn set_usage(
        pool: &PgPool,
        id: DbId,
        total_hours: f64,
        productive_hours: f64,
        downtime_hours: f64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE equipment
             SET usage_hours = $2, productive_hours = $3, downtime_hours = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(total_hours)
        .bind(productive_hours)
        .bind(downtime_hours)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
