//! 存储接口的 PostgreSQL 实现

pub mod channel_repository_impl;
pub mod message_repository_impl;
pub mod user_repository_impl;

pub use channel_repository_impl::*;
pub use message_repository_impl::*;
pub use user_repository_impl::*;

use domain::repositories::RepositoryError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        other => RepositoryError::Database(other.to_string()),
    }
}
