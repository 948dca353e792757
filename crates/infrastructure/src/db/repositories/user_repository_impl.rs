//! 用户Repository实现

use crate::db::repositories::map_sqlx_error;
use crate::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::entities::User;
use domain::repositories::{RepositoryResult, UserRepository};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: Uuid,
    username: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(db_user: DbUser) -> Self {
        User {
            id: db_user.id,
            username: db_user.username,
            created_at: db_user.created_at,
            updated_at: db_user.updated_at,
        }
    }
}

/// 用户Repository实现
pub struct PostgresUserRepository {
    pool: DbPool,
}

impl PostgresUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        sqlx::query(
            "INSERT INTO users (id, username, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(user)
    }

    async fn update(&self, user: User) -> RepositoryResult<User> {
        sqlx::query(
            "UPDATE users SET username = $2, updated_at = $3 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let row: Option<DbUser> = sqlx::query_as(
            "SELECT id, username, created_at, updated_at FROM users \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(User::from))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        sqlx::query("UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
