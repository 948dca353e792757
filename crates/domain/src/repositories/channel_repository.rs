//! 频道存储接口

use crate::entities::Channel;
use crate::repositories::RepositoryResult;
use async_trait::async_trait;
use uuid::Uuid;

/// 频道存储
///
/// `find_by_id` 与 `list` 只返回未删除的频道。成员集的并发修改在存储层
/// 以读-改-写的方式竞争，事务边界是唯一的串行化点。
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn create(&self, channel: Channel) -> RepositoryResult<Channel>;

    /// 保存频道，整体替换成员集
    async fn update(&self, channel: Channel) -> RepositoryResult<Channel>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Channel>>;

    async fn list(&self) -> RepositoryResult<Vec<Channel>>;

    /// 删除单条成员边
    async fn remove_member(&self, channel_id: Uuid, user_id: Uuid) -> RepositoryResult<()>;

    /// 软删除频道，同时清除其成员边
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}
