//! PostgreSQL 连接与存储实现

pub mod repositories;

pub use repositories::*;

use config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;

/// 数据库连接池类型
pub type DbPool = sqlx::PgPool;

/// 创建 PostgreSQL 连接池
pub async fn create_pg_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}
