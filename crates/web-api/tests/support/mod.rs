//! 集成测试支撑：内存存储假件与完整路由的装配

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use application::{ChatService, ChatServiceDependencies, LocalEventBus};
use async_trait::async_trait;
use axum::Router;
use domain::entities::{Channel, ChatMessage, User};
use domain::repositories::{
    ChannelRepository, MessageRepository, RepositoryError, RepositoryResult, UserRepository,
};
use uuid::Uuid;
use web_api::{router, AppState};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> RepositoryResult<User> {
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.users.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryChannelRepository {
    channels: Mutex<HashMap<Uuid, Channel>>,
}

#[async_trait]
impl ChannelRepository for InMemoryChannelRepository {
    async fn create(&self, channel: Channel) -> RepositoryResult<Channel> {
        self.channels
            .lock()
            .unwrap()
            .insert(channel.id, channel.clone());
        Ok(channel)
    }

    async fn update(&self, channel: Channel) -> RepositoryResult<Channel> {
        self.channels
            .lock()
            .unwrap()
            .insert(channel.id, channel.clone());
        Ok(channel)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Channel>> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .get(&id)
            .filter(|c| !c.is_deleted())
            .cloned())
    }

    async fn list(&self) -> RepositoryResult<Vec<Channel>> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .values()
            .filter(|c| !c.is_deleted())
            .cloned()
            .collect())
    }

    async fn remove_member(&self, channel_id: Uuid, user_id: Uuid) -> RepositoryResult<()> {
        if let Some(channel) = self.channels.lock().unwrap().get_mut(&channel_id) {
            channel.remove_member(user_id);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        if let Some(channel) = self.channels.lock().unwrap().get_mut(&id) {
            channel.mark_deleted();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<ChatMessage>>,
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: ChatMessage) -> RepositoryResult<ChatMessage> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn update(&self, message: ChatMessage) -> RepositoryResult<ChatMessage> {
        let mut messages = self.messages.lock().unwrap();
        let stored = messages
            .iter_mut()
            .find(|m| m.id == message.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = message.clone();
        Ok(message)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<ChatMessage>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        self.messages.lock().unwrap().retain(|m| m.id != id);
        Ok(())
    }

    async fn list_by_channel(&self, channel_id: Uuid) -> RepositoryResult<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

pub struct TestApp {
    pub router: Router,
    pub service: Arc<ChatService>,
    pub users: Arc<InMemoryUserRepository>,
    pub channels: Arc<InMemoryChannelRepository>,
}

/// 装配内存存储与本地事件总线之上的完整应用
pub fn build_app() -> TestApp {
    let users = Arc::new(InMemoryUserRepository::default());
    let channels = Arc::new(InMemoryChannelRepository::default());
    let messages = Arc::new(InMemoryMessageRepository::default());
    let bus = LocalEventBus::new();

    let service = Arc::new(ChatService::new(ChatServiceDependencies {
        channel_repository: channels.clone(),
        user_repository: users.clone(),
        message_repository: messages,
        event_bus: Arc::new(bus),
        delete_grace: Duration::from_millis(50),
    }));

    let state = AppState::new(service.clone(), users.clone());

    TestApp {
        router: router(state),
        service,
        users,
        channels,
    }
}

/// 在随机端口上启动服务器，返回监听地址
pub async fn spawn_server(router: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}
