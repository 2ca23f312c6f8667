//! Repositories for `users`, `sites`, and `site_members`.

use sqlx::PgPool;

use pilelog_core::roles::{ROLE_ADMIN, ROLE_SUPERVISOR};
use pilelog_core::types::DbId;

use crate::models::user::{CreateSite, CreateUser, Site, User};

const USER_COLUMNS: &str = "id, email, display_name, role, is_active, created_at, updated_at";

const SITE_COLUMNS: &str = "id, code, name, created_at, updated_at, deleted_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, display_name, role) VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.display_name)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active admins plus active supervisors assigned to the site.
    pub async fn alert_recipients(pool: &PgPool, site_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT u.id FROM users u
             WHERE u.is_active
               AND (u.role = $2
                    OR (u.role = $3 AND EXISTS(
                        SELECT 1 FROM site_members m
                        WHERE m.user_id = u.id AND m.site_id = $1)))
             ORDER BY u.id ASC",
        )
        .bind(site_id)
        .bind(ROLE_ADMIN)
        .bind(ROLE_SUPERVISOR)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

pub struct SiteRepo;

impl SiteRepo {
    pub async fn create(pool: &PgPool, input: &CreateSite) -> Result<Site, sqlx::Error> {
        let query = format!(
            "INSERT INTO sites (code, name) VALUES ($1, $2) RETURNING {SITE_COLUMNS}"
        );
        sqlx::query_as::<_, Site>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Assign a user to a site. Re-assigning is a no-op.
    pub async fn add_member(pool: &PgPool, site_id: DbId, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO site_members (site_id, user_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(site_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
