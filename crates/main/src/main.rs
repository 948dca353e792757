//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::{sync::Arc, time::Duration};

use application::{ChatService, ChatServiceDependencies, EventBus};
use config::AppConfig;
use domain::repositories::{ChannelRepository, MessageRepository, UserRepository};
use infrastructure::{
    create_pg_pool, KafkaEventBus, PostgresChannelRepository, PostgresMessageRepository,
    PostgresUserRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 存储实现
    let user_repository: Arc<dyn UserRepository> =
        Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let channel_repository: Arc<dyn ChannelRepository> =
        Arc::new(PostgresChannelRepository::new(pg_pool.clone()));
    let message_repository: Arc<dyn MessageRepository> =
        Arc::new(PostgresMessageRepository::new(pg_pool));

    // 消息代理桥接
    tracing::info!(brokers = ?config.kafka.brokers, "连接 Kafka");
    let event_bus: Arc<dyn EventBus> = Arc::new(KafkaEventBus::new(config.kafka.clone())?);

    // 中继编排器
    let chat_service = ChatService::new(ChatServiceDependencies {
        channel_repository,
        user_repository: user_repository.clone(),
        message_repository,
        event_bus,
        delete_grace: Duration::from_secs(config.relay.delete_grace_secs),
    });

    let state = AppState::new(Arc::new(chat_service), user_repository);

    // 启动 Web 服务器
    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务器启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
