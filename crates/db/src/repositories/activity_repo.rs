//! Repository for the `activities` table.

use sqlx::{PgConnection, PgPool};

use pilelog_core::types::DbId;
use pilelog_store::Activity;

use crate::models::activity::ActivityRow;

/// Column list for activities queries.
const COLUMNS: &str = "id, site_id, activity_type, activity_date, status, details, notes, \
    version, client_change_id, created_by, approved_by, approved_at, rejection_notes, \
    created_at, updated_at, deleted_at";

pub struct ActivityRepo;

impl ActivityRepo {
    /// Insert a new activity exactly as given, returning the stored row.
    pub async fn insert(conn: &mut PgConnection, a: &Activity) -> Result<ActivityRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO activities
                (id, site_id, activity_type, activity_date, status, details, notes,
                 version, client_change_id, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityRow>(&query)
            .bind(&a.id)
            .bind(a.site_id)
            .bind(a.activity_type.as_str())
            .bind(a.activity_date)
            .bind(a.status.as_str())
            .bind(&a.details)
            .bind(&a.notes)
            .bind(a.version)
            .bind(&a.client_change_id)
            .bind(a.created_by)
            .bind(a.created_at)
            .fetch_one(conn)
            .await
    }

    /// Lock and return an activity, soft-deleted rows included.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: &str,
    ) -> Result<Option<ActivityRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM activities WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, ActivityRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_by_client_change_id(
        conn: &mut PgConnection,
        client_change_id: &str,
    ) -> Result<Option<ActivityRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM activities WHERE client_change_id = $1");
        sqlx::query_as::<_, ActivityRow>(&query)
            .bind(client_change_id)
            .fetch_optional(conn)
            .await
    }

    /// Write every mutable column if the stored version still equals
    /// `a.version`, bumping it by one.
    ///
    /// Returns `None` when the row moved on, is deleted, or does not exist.
    pub async fn update_versioned(
        conn: &mut PgConnection,
        a: &Activity,
    ) -> Result<Option<ActivityRow>, sqlx::Error> {
        let query = format!(
            "UPDATE activities SET
                site_id = $3, activity_type = $4, activity_date = $5, status = $6,
                details = $7, notes = $8, approved_by = $9, approved_at = $10,
                rejection_notes = $11, version = version + 1
             WHERE id = $1 AND version = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityRow>(&query)
            .bind(&a.id)
            .bind(a.version)
            .bind(a.site_id)
            .bind(a.activity_type.as_str())
            .bind(a.activity_date)
            .bind(a.status.as_str())
            .bind(&a.details)
            .bind(&a.notes)
            .bind(a.approved_by)
            .bind(a.approved_at)
            .bind(&a.rejection_notes)
            .fetch_optional(conn)
            .await
    }

    /// Soft-delete an activity. Returns `true` if a live row was tombstoned.
    pub async fn soft_delete(conn: &mut PgConnection, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE activities SET deleted_at = NOW(), version = version + 1
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a live activity by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<ActivityRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM activities WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, ActivityRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Live APPROVED activities whose `details.equipmentUsed` references
    /// the given equipment.
    pub async fn list_approved_using_equipment(
        pool: &PgPool,
        equipment_id: DbId,
    ) -> Result<Vec<ActivityRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activities
             WHERE status = 'APPROVED'
               AND deleted_at IS NULL
               AND details -> 'equipmentUsed' @> $1
             ORDER BY activity_date ASC, id ASC"
        );
        sqlx::query_as::<_, ActivityRow>(&query)
            .bind(serde_json::json!([{ "equipmentId": equipment_id }]))
            .fetch_all(pool)
            .await
    }
}
