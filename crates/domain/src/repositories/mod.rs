//! 存储层抽象接口
//!
//! 持久化是外部协作者，核心只通过这些窄接口访问。

pub mod channel_repository;
pub mod message_repository;
pub mod user_repository;

pub use channel_repository::*;
pub use message_repository::*;
pub use user_repository::*;

use thiserror::Error;

/// 存储层错误
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 记录不存在
    #[error("记录不存在")]
    NotFound,

    /// 底层数据库错误
    #[error("数据库错误: {0}")]
    Database(String),
}

/// 存储层结果类型
pub type RepositoryResult<T> = Result<T, RepositoryError>;
