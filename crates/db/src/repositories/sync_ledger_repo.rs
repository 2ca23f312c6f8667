//! Repository for the `sync_ledger` idempotency table.

use sqlx::PgConnection;

use pilelog_core::sync::IdempotencyKey;
use pilelog_core::types::DbId;

pub struct SyncLedgerRepo;

impl SyncLedgerRepo {
    /// Take a transaction-scoped advisory lock on the key, so two pushes of
    /// the same change serialise on the ledger check.
    pub async fn lock_key(conn: &mut PgConnection, key: &IdempotencyKey) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key.to_string())
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn exists(conn: &mut PgConnection, key: &IdempotencyKey) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM sync_ledger
                WHERE client_change_id = $1 AND entity_type = $2 AND entity_id = $3
             )",
        )
        .bind(&key.client_change_id)
        .bind(&key.entity_type)
        .bind(&key.entity_id)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        key: &IdempotencyKey,
        actor_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sync_ledger (client_change_id, entity_type, entity_id, actor_id)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&key.client_change_id)
        .bind(&key.entity_type)
        .bind(&key.entity_id)
        .bind(actor_id)
        .execute(conn)
        .await?;
        Ok(())
    }
}
