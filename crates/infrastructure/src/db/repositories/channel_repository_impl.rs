//! 频道Repository实现
//!
//! 成员集存放在 channel_users 关联表，复合主键保证不含重复成员。
//! 并发的成员变更在这里以读-改-写的方式竞争，事务是唯一的串行化点。

use crate::db::repositories::map_sqlx_error;
use crate::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::entities::Channel;
use domain::repositories::{ChannelRepository, RepositoryResult};
use sqlx::{FromRow, Row};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct DbChannel {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl DbChannel {
    fn into_channel(self, members: Vec<Uuid>) -> Channel {
        Channel {
            id: self.id,
            name: self.name,
            members,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// 频道Repository实现
pub struct PostgresChannelRepository {
    pool: DbPool,
}

impl PostgresChannelRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_members(&self, channel_id: Uuid) -> RepositoryResult<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT user_id FROM channel_users WHERE channel_id = $1 ORDER BY joined_at",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }
}

#[async_trait]
impl ChannelRepository for PostgresChannelRepository {
    async fn create(&self, channel: Channel) -> RepositoryResult<Channel> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO channels (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for user_id in &channel.members {
            sqlx::query("INSERT INTO channel_users (channel_id, user_id) VALUES ($1, $2)")
                .bind(channel.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(channel)
    }

    async fn update(&self, channel: Channel) -> RepositoryResult<Channel> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("UPDATE channels SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(channel.id)
            .bind(&channel.name)
            .bind(channel.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        // 整体替换成员集
        sqlx::query("DELETE FROM channel_users WHERE channel_id = $1")
            .bind(channel.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for user_id in &channel.members {
            sqlx::query(
                "INSERT INTO channel_users (channel_id, user_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(channel.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(channel)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Channel>> {
        let row: Option<DbChannel> = sqlx::query_as(
            "SELECT id, name, created_at, updated_at, deleted_at FROM channels \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(db_channel) = row else {
            return Ok(None);
        };

        let members = self.load_members(id).await?;
        Ok(Some(db_channel.into_channel(members)))
    }

    async fn list(&self) -> RepositoryResult<Vec<Channel>> {
        let rows: Vec<DbChannel> = sqlx::query_as(
            "SELECT id, name, created_at, updated_at, deleted_at FROM channels \
             WHERE deleted_at IS NULL ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut channels = Vec::with_capacity(rows.len());
        for db_channel in rows {
            let members = self.load_members(db_channel.id).await?;
            channels.push(db_channel.into_channel(members));
        }

        Ok(channels)
    }

    async fn remove_member(&self, channel_id: Uuid, user_id: Uuid) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM channel_users WHERE channel_id = $1 AND user_id = $2")
            .bind(channel_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM channel_users WHERE channel_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        // 软删除：消息历史不级联删除
        sqlx::query("UPDATE channels SET deleted_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
