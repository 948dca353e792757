//! 用户存储接口

use crate::entities::User;
use crate::repositories::RepositoryResult;
use async_trait::async_trait;
use uuid::Uuid;

/// 用户存储
///
/// 中继核心只使用 `find_by_id` 校验身份，其余操作服务于用户管理接口。
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> RepositoryResult<User>;

    async fn update(&self, user: User) -> RepositoryResult<User>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;

    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}
