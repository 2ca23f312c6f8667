//! Repository for the `hold_points` table.

use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor};

use pilelog_core::types::DbId;
use pilelog_store::{HoldPoint, NewHoldPoint};

use crate::models::hold_point::HoldPointRow;

const COLUMNS: &str = "id, activity_id, hold_point_type, status, checklist, signed_by_name, \
    signed_by_id, signed_at, signature_data, comments, rejection_notes, rejected_by_id, \
    rejected_at, created_at, updated_at";

pub struct HoldPointRepo;

impl HoldPointRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewHoldPoint,
    ) -> Result<HoldPointRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO hold_points (activity_id, hold_point_type, sequence, checklist)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HoldPointRow>(&query)
            .bind(&input.activity_id)
            .bind(input.hold_point_type.as_str())
            .bind(input.hold_point_type.sequence())
            .bind(Json(&input.checklist))
            .fetch_one(conn)
            .await
    }

    /// Hold points of an activity in signing order.
    pub async fn list_for_activity<'e, E>(
        executor: E,
        activity_id: &str,
    ) -> Result<Vec<HoldPointRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM hold_points WHERE activity_id = $1 ORDER BY sequence ASC"
        );
        sqlx::query_as::<_, HoldPointRow>(&query)
            .bind(activity_id)
            .fetch_all(executor)
            .await
    }

    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<HoldPointRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hold_points WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, HoldPointRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Write the decision fields, only while the stored row is PENDING.
    pub async fn decide(
        conn: &mut PgConnection,
        hp: &HoldPoint,
    ) -> Result<Option<HoldPointRow>, sqlx::Error> {
        let query = format!(
            "UPDATE hold_points SET
                status = $2, checklist = $3, signed_by_name = $4, signed_by_id = $5,
                signed_at = $6, signature_data = $7, comments = $8, rejection_notes = $9,
                rejected_by_id = $10, rejected_at = $11
             WHERE id = $1 AND status = 'PENDING'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HoldPointRow>(&query)
            .bind(hp.id)
            .bind(hp.status.as_str())
            .bind(Json(&hp.checklist))
            .bind(&hp.signed_by_name)
            .bind(hp.signed_by_id)
            .bind(hp.signed_at)
            .bind(&hp.signature_data)
            .bind(&hp.comments)
            .bind(&hp.rejection_notes)
            .bind(hp.rejected_by_id)
            .bind(hp.rejected_at)
            .fetch_optional(conn)
            .await
    }
}
