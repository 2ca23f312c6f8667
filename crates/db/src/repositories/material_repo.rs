//! Repository for the `materials` and `material_stock_history` tables.

use sqlx::PgPool;

use pilelog_core::types::DbId;
use pilelog_store::{MaterialDeduction, MOVEMENT_DEDUCT};

use crate::models::inventory::{CreateMaterial, MaterialRow, StockMovementRow};

const COLUMNS: &str = "id, site_id, name, unit, current_stock, minimum_stock";

const HISTORY_COLUMNS: &str = "id, material_id, movement_type, quantity, resulting_stock, \
    activity_id, actor_id, note, created_at";

/// Result of [`MaterialRepo::deduct`].
#[derive(Debug, Clone)]
pub enum DeductResult {
    Deducted(MaterialRow),
    AlreadyDeducted,
    InsufficientStock { available: f64 },
    MaterialNotFound,
}

pub struct MaterialRepo;

impl MaterialRepo {
    pub async fn create(pool: &PgPool, input: &CreateMaterial) -> Result<MaterialRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO materials (site_id, name, unit, current_stock, minimum_stock)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MaterialRow>(&query)
            .bind(input.site_id)
            .bind(&input.name)
            .bind(&input.unit)
            .bind(input.current_stock)
            .bind(input.minimum_stock)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MaterialRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM materials WHERE id = $1");
        sqlx::query_as::<_, MaterialRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Materials of a site, oldest first.
    pub async fn list_for_site(pool: &PgPool, site_id: DbId) -> Result<Vec<MaterialRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM materials WHERE site_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, MaterialRow>(&query)
            .bind(site_id)
            .fetch_all(pool)
            .await
    }

    /// Decrement stock and append a DEDUCT movement in one transaction.
    ///
    /// At most one DEDUCT movement exists per (material, activity); stock
    /// never goes below zero.
    pub async fn deduct(pool: &PgPool, d: &MaterialDeduction) -> Result<DeductResult, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM materials WHERE id = $1 FOR UPDATE");
        let Some(material) = sqlx::query_as::<_, MaterialRow>(&query)
            .bind(d.material_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(DeductResult::MaterialNotFound);
        };

        let (already,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM material_stock_history
                WHERE material_id = $1 AND activity_id = $2 AND movement_type = $3
             )",
        )
        .bind(d.material_id)
        .bind(&d.activity_id)
        .bind(MOVEMENT_DEDUCT)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Ok(DeductResult::AlreadyDeducted);
        }

        if material.current_stock < d.quantity {
            return Ok(DeductResult::InsufficientStock {
                available: material.current_stock,
            });
        }

        let query = format!(
            "UPDATE materials SET current_stock = current_stock - $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, MaterialRow>(&query)
            .bind(d.material_id)
            .bind(d.quantity)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO material_stock_history
                (material_id, movement_type, quantity, resulting_stock, activity_id, actor_id, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(d.material_id)
        .bind(MOVEMENT_DEDUCT)
        .bind(-d.quantity)
        .bind(updated.current_stock)
        .bind(&d.activity_id)
        .bind(d.actor_id)
        .bind(&d.note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(DeductResult::Deducted(updated))
    }

    /// Stock movements of a material, oldest first.
    pub async fn history(
        pool: &PgPool,
        material_id: DbId,
    ) -> Result<Vec<StockMovementRow>, sqlx::Error> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM material_stock_history
             WHERE material_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, StockMovementRow>(&query)
            .bind(material_id)
            .fetch_all(pool)
            .await
    }
}
