//! 应用层错误定义

use crate::event_bus::BrokerError;
use domain::errors::DomainError;
use domain::repositories::RepositoryError;
use thiserror::Error;
use uuid::Uuid;

/// 应用层错误类型
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 领域层错误
    #[error("领域错误: {0}")]
    Domain(#[from] DomainError),

    /// 引用的资源不存在
    #[error("资源未找到: {resource} {id}")]
    NotFound { resource: &'static str, id: Uuid },

    /// 验证错误
    #[error("验证失败: {0}")]
    Validation(String),

    /// 消息代理不可用
    #[error("消息代理错误: {0}")]
    Broker(#[from] BrokerError),

    /// 持久化错误
    #[error("存储错误: {0}")]
    Store(#[from] RepositoryError),

    /// 序列化错误
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApplicationError {
    pub fn not_found(resource: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource, id }
    }
}

/// 应用层结果类型
pub type ApplicationResult<T> = Result<T, ApplicationError>;
