//! Repository for the `notifications` table.

use sqlx::PgPool;

use pilelog_core::notify::Notification;
use pilelog_core::types::DbId;

use crate::models::notification::NotificationRow;

const COLUMNS: &str =
    "id, user_id, kind, title, message, data, is_read, read_at, created_at, updated_at";

pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn create(pool: &PgPool, n: &Notification) -> Result<NotificationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (user_id, kind, title, message, data)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(n.user_id)
            .bind(&n.kind)
            .bind(&n.title)
            .bind(&n.message)
            .bind(&n.data)
            .fetch_one(pool)
            .await
    }

    /// Notifications for a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
             ORDER BY created_at DESC, id DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Mark one of the user's notifications read. Returns `false` if not found.
    pub async fn mark_read(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW()
             WHERE id = $1 AND user_id = $2 AND is_read = FALSE",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
