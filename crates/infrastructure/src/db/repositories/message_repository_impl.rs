//! 消息Repository实现

use crate::db::repositories::map_sqlx_error;
use crate::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::entities::ChatMessage;
use domain::repositories::{MessageRepository, RepositoryError, RepositoryResult};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    id: Uuid,
    channel_id: Uuid,
    sender_id: Uuid,
    sender_name: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbMessage> for ChatMessage {
    fn from(db_message: DbMessage) -> Self {
        ChatMessage {
            id: db_message.id,
            channel_id: db_message.channel_id,
            sender_id: db_message.sender_id,
            sender_name: db_message.sender_name,
            content: db_message.content,
            created_at: db_message.created_at,
            updated_at: db_message.updated_at,
        }
    }
}

/// 消息Repository实现
pub struct PostgresMessageRepository {
    pool: DbPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn create(&self, message: ChatMessage) -> RepositoryResult<ChatMessage> {
        sqlx::query(
            "INSERT INTO messages (id, channel_id, sender_id, sender_name, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(message.id)
        .bind(message.channel_id)
        .bind(message.sender_id)
        .bind(&message.sender_name)
        .bind(&message.content)
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(message)
    }

    async fn update(&self, message: ChatMessage) -> RepositoryResult<ChatMessage> {
        let result = sqlx::query(
            "UPDATE messages SET content = $2, updated_at = $3 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(message.id)
        .bind(&message.content)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(message)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<ChatMessage>> {
        let row: Option<DbMessage> = sqlx::query_as(
            "SELECT id, channel_id, sender_id, sender_name, content, created_at, updated_at \
             FROM messages WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ChatMessage::from))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        sqlx::query("UPDATE messages SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_by_channel(&self, channel_id: Uuid) -> RepositoryResult<Vec<ChatMessage>> {
        let rows: Vec<DbMessage> = sqlx::query_as(
            "SELECT id, channel_id, sender_id, sender_name, content, created_at, updated_at \
             FROM messages WHERE channel_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at ASC",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }
}
