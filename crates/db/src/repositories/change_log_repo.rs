//! Repository for the `change_log` and `sync_version_counter` tables.

use sqlx::{PgConnection, PgPool};

use pilelog_core::types::DbId;
use pilelog_store::NewChangeLogEntry;

use crate::models::change_log::ChangeLogRow;

const COLUMNS: &str =
    "server_version, actor_id, client_change_id, action, entity_type, entity_id, payload, applied_at";

pub struct ChangeLogRepo;

impl ChangeLogRepo {
    /// Claim the next server version.
    ///
    /// The counter row stays locked until the transaction ends, so versions
    /// are assigned and committed in the same order.
    pub async fn next_version(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
        let (value,): (i64,) = sqlx::query_as(
            "UPDATE sync_version_counter SET value = value + 1 WHERE id = 1 RETURNING value",
        )
        .fetch_one(conn)
        .await?;
        Ok(value)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        server_version: i64,
        entry: &NewChangeLogEntry,
    ) -> Result<ChangeLogRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO change_log
                (server_version, actor_id, client_change_id, action, entity_type, entity_id, payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChangeLogRow>(&query)
            .bind(server_version)
            .bind(entry.actor_id)
            .bind(&entry.client_change_id)
            .bind(entry.action.as_str())
            .bind(&entry.entity_type)
            .bind(&entry.entity_id)
            .bind(&entry.payload)
            .fetch_one(conn)
            .await
    }

    /// Highest committed version.
    pub async fn current_version(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (value,): (i64,) = sqlx::query_as("SELECT value FROM sync_version_counter WHERE id = 1")
            .fetch_one(pool)
            .await?;
        Ok(value)
    }

    /// Entries after `since` written by anyone but `exclude_actor`, ascending.
    pub async fn list_since(
        pool: &PgPool,
        since: i64,
        exclude_actor: DbId,
    ) -> Result<Vec<ChangeLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM change_log
             WHERE server_version > $1 AND actor_id <> $2
             ORDER BY server_version ASC"
        );
        sqlx::query_as::<_, ChangeLogRow>(&query)
            .bind(since)
            .bind(exclude_actor)
            .fetch_all(pool)
            .await
    }

    pub async fn count_since(
        pool: &PgPool,
        since: i64,
        exclude_actor: DbId,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM change_log WHERE server_version > $1 AND actor_id <> $2",
        )
        .bind(since)
        .bind(exclude_actor)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
