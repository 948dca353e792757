//! 聊天服务
//!
//! 中继编排器：组合频道成员管理、消息代理桥接与消息历史，
//! 暴露频道的全部对外操作。所有协作者通过构造函数显式注入。

use crate::errors::{ApplicationError, ApplicationResult};
use crate::event_bus::{handoff, EventBus, MessageStream};
use domain::entities::{Channel, ChatMessage};
use domain::repositories::{ChannelRepository, MessageRepository, UserRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 空频道删除前的默认宽限期
pub const DEFAULT_DELETE_GRACE: Duration = Duration::from_secs(3);

/// 聊天服务依赖
pub struct ChatServiceDependencies {
    pub channel_repository: Arc<dyn ChannelRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub event_bus: Arc<dyn EventBus>,
    /// 空频道删除前的宽限期
    pub delete_grace: Duration,
}

/// 聊天服务
pub struct ChatService {
    channels: Arc<dyn ChannelRepository>,
    users: Arc<dyn UserRepository>,
    messages: Arc<dyn MessageRepository>,
    event_bus: Arc<dyn EventBus>,
    delete_grace: Duration,
    /// 按频道ID登记的待删除定时任务，重新加入时取消
    pending_deletions: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self {
            channels: deps.channel_repository,
            users: deps.user_repository,
            messages: deps.message_repository,
            event_bus: deps.event_bus,
            delete_grace: deps.delete_grace,
            pending_deletions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 创建频道，发起者自动成为首个成员
    pub async fn start_channel(
        &self,
        founder_id: Uuid,
        name: impl Into<String>,
    ) -> ApplicationResult<Channel> {
        self.users
            .find_by_id(founder_id)
            .await?
            .ok_or(ApplicationError::not_found("user", founder_id))?;

        let channel = Channel::new(name, founder_id)?;
        let channel = self.channels.create(channel).await?;

        info!(channel_id = %channel.id, founder_id = %founder_id, "频道已创建");
        Ok(channel)
    }

    /// 把用户加入频道
    ///
    /// 幂等操作：重复加入已存在的成员不产生持久化写入。
    pub async fn add_user_to_channel(
        &self,
        channel_id: Uuid,
        user_id: Uuid,
    ) -> ApplicationResult<()> {
        let mut channel = self
            .channels
            .find_by_id(channel_id)
            .await?
            .ok_or(ApplicationError::not_found("channel", channel_id))?;

        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ApplicationError::not_found("user", user_id))?;

        // 宽限期内重新有人加入，取消待删除任务
        self.cancel_pending_deletion(channel_id);

        if channel.add_member(user_id) {
            self.channels.update(channel).await?;
            debug!(channel_id = %channel_id, user_id = %user_id, "用户已加入频道");
        }

        Ok(())
    }

    /// 把用户移出频道
    ///
    /// 移除不存在的成员是无操作。若移除后成员集为空，登记延迟删除任务；
    /// 删除的调度是即发即忘，不阻塞调用方。
    pub async fn remove_user_from_channel(
        &self,
        channel_id: Uuid,
        user_id: Uuid,
    ) -> ApplicationResult<()> {
        let mut channel = self
            .channels
            .find_by_id(channel_id)
            .await?
            .ok_or(ApplicationError::not_found("channel", channel_id))?;

        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ApplicationError::not_found("user", user_id))?;

        if !channel.remove_member(user_id) {
            return Ok(());
        }

        self.channels.remove_member(channel_id, user_id).await?;
        debug!(channel_id = %channel_id, user_id = %user_id, "用户已离开频道");

        if channel.is_empty() {
            self.schedule_deletion(channel_id);
        }

        Ok(())
    }

    /// 列出所有未删除的频道及其成员集
    pub async fn list_channels(&self) -> ApplicationResult<Vec<Channel>> {
        Ok(self.channels.list().await?)
    }

    /// 发送消息
    ///
    /// 写入时解析并固化发送者的展示名；先持久化、后发布，保证订阅者
    /// 看到的消息最终都能在历史中查到。两步之间不构成事务，进程在
    /// 中间崩溃会留下一条已持久化未发布的消息。
    pub async fn send_message(
        &self,
        channel_id: Uuid,
        sender_id: Uuid,
        content: impl Into<String>,
    ) -> ApplicationResult<ChatMessage> {
        let sender = self
            .users
            .find_by_id(sender_id)
            .await?
            .ok_or(ApplicationError::not_found("user", sender_id))?;

        self.channels
            .find_by_id(channel_id)
            .await?
            .ok_or(ApplicationError::not_found("channel", channel_id))?;

        let message = ChatMessage::new(channel_id, sender_id, sender.username, content)?;
        let message = self.messages.create(message).await?;

        let payload = serde_json::to_vec(&message)?;
        self.event_bus.publish(channel_id, &payload).await?;

        Ok(message)
    }

    /// 原地编辑消息体
    pub async fn edit_message(
        &self,
        message_id: Uuid,
        content: impl Into<String>,
    ) -> ApplicationResult<ChatMessage> {
        let mut message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or(ApplicationError::not_found("message", message_id))?;

        message.edit_content(content)?;
        Ok(self.messages.update(message).await?)
    }

    /// 删除单条消息
    pub async fn delete_message(&self, message_id: Uuid) -> ApplicationResult<()> {
        Ok(self.messages.delete(message_id).await?)
    }

    /// 打开 (用户, 频道) 的消费流
    ///
    /// 校验两个身份都存在后向代理订阅，并在转发前做一次解码校验：
    /// 无法解析为消息的负载被丢弃（记录日志），不中断流。
    ///
    /// 消费组身份固定为 `user-channel`，同一用户对同一频道的重连
    /// 从上次提交的偏移量继续；同一用户同时打开两条到同一频道的
    /// 连接会共享游标、竞争消息。
    pub async fn receive_messages(
        &self,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> ApplicationResult<MessageStream> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ApplicationError::not_found("user", user_id))?;

        self.channels
            .find_by_id(channel_id)
            .await?
            .ok_or(ApplicationError::not_found("channel", channel_id))?;

        let group = format!("{user_id}-{channel_id}");
        let mut upstream = self.event_bus.subscribe(&group, channel_id).await?;

        let (tx, stream) = handoff();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    payload = upstream.recv() => {
                        let Some(payload) = payload else { break };
                        if serde_json::from_slice::<ChatMessage>(&payload).is_err() {
                            warn!(channel_id = %channel_id, "丢弃无法解码的负载");
                            continue;
                        }
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
            upstream.close();
            debug!(channel_id = %channel_id, user_id = %user_id, "消费转发任务结束");
        });

        Ok(stream)
    }

    /// 返回频道内按创建时间升序的消息历史
    pub async fn get_channel_history(
        &self,
        channel_id: Uuid,
    ) -> ApplicationResult<Vec<ChatMessage>> {
        Ok(self.messages.list_by_channel(channel_id).await?)
    }

    /// 登记延迟删除任务
    ///
    /// 宽限期到期后重读成员集，仍为空才删除。任务独立于触发请求运行，
    /// 失败只记录日志，不重试，也不上报任何调用方。
    fn schedule_deletion(&self, channel_id: Uuid) {
        let channels = self.channels.clone();
        let pending = self.pending_deletions.clone();
        let grace = self.delete_grace;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            if let Ok(mut pending) = pending.lock() {
                pending.remove(&channel_id);
            }

            // 宽限期内可能有人重新加入，到期时重读判断
            match channels.find_by_id(channel_id).await {
                Ok(Some(channel)) if channel.is_empty() => {
                    match channels.delete(channel_id).await {
                        Ok(()) => info!(channel_id = %channel_id, "空频道已删除"),
                        Err(err) => {
                            warn!(channel_id = %channel_id, error = %err, "删除空频道失败")
                        }
                    }
                }
                Ok(Some(_)) => {
                    debug!(channel_id = %channel_id, "频道在宽限期内重新有人加入，跳过删除")
                }
                Ok(None) => {}
                Err(err) => warn!(channel_id = %channel_id, error = %err, "重读频道失败"),
            }
        });

        if let Ok(mut pending) = self.pending_deletions.lock() {
            // 同一频道重复登记时只保留最新的任务
            if let Some(previous) = pending.insert(channel_id, handle) {
                previous.abort();
            }
        }
    }

    /// 取消频道的待删除任务（如果有）
    fn cancel_pending_deletion(&self, channel_id: Uuid) {
        if let Ok(mut pending) = self.pending_deletions.lock() {
            if let Some(handle) = pending.remove(&channel_id) {
                handle.abort();
                debug!(channel_id = %channel_id, "已取消待删除任务");
            }
        }
    }
}
