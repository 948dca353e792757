//! 消息存储接口

use crate::entities::ChatMessage;
use crate::repositories::RepositoryResult;
use async_trait::async_trait;
use uuid::Uuid;

/// 消息历史存储
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: ChatMessage) -> RepositoryResult<ChatMessage>;

    /// 原地更新消息体（同一ID，`created_at` 不变）
    async fn update(&self, message: ChatMessage) -> RepositoryResult<ChatMessage>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<ChatMessage>>;

    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    /// 按创建时间升序返回频道内的消息
    async fn list_by_channel(&self, channel_id: Uuid) -> RepositoryResult<Vec<ChatMessage>>;
}
