//! 消息代理抽象
//!
//! 将持久化、分区、只追加的日志抽象包装成两个原语：
//! 向频道主题发布一条消息，以及为 (消费组, 频道) 打开一个惰性无限的
//! 原始负载流。每个频道对应一个主题。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// 消费流与后台拉取任务之间的交接通道容量
///
/// 容量为 1 的有界通道：消费端变慢时，背压一路传导到代理拉取，
/// 不引入缓冲层。
pub const HANDOFF_CAPACITY: usize = 1;

/// 消息代理错误
#[derive(Debug, Error)]
pub enum BrokerError {
    /// 发布失败
    #[error("发布失败: {0}")]
    Publish(String),

    /// 订阅失败
    #[error("订阅失败: {0}")]
    Subscribe(String),
}

impl BrokerError {
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish(message.into())
    }

    pub fn subscribe(message: impl Into<String>) -> Self {
        Self::Subscribe(message.into())
    }
}

/// 消息代理接口
///
/// 投递语义为至少一次：消息可能在偏移量提交前丢失连接而在重连后重复，
/// 本层不做去重。
#[async_trait]
pub trait EventBus: Send + Sync {
    /// 向频道主题追加一条序列化后的消息
    ///
    /// 发布失败直接返回给调用方，不做重试。
    async fn publish(&self, channel_id: Uuid, payload: &[u8]) -> Result<(), BrokerError>;

    /// 为 (消费组, 频道) 打开一个消费流
    ///
    /// 从最早保留的偏移量开始，按代理提交的顺序逐条产出。同一消费组
    /// 关闭后重新订阅会从上次提交的偏移量继续，而不是从头开始。
    async fn subscribe(&self, group: &str, channel_id: Uuid) -> Result<MessageStream, BrokerError>;
}

/// 消费流
///
/// 惰性无限的原始负载序列。`recv` 阻塞直到新消息到达或流被关闭；
/// 关闭（或丢弃）后，后台拉取任务在两次拉取之间观察到取消并干净退出，
/// 释放底层游标。
pub struct MessageStream {
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl MessageStream {
    pub fn new(receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { receiver }
    }

    /// 接收下一条消息，流结束时返回 `None`
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }

    /// 合作式关闭：后续拉取端的发送会失败并退出
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

/// 创建一条拉取任务与消费流之间的交接通道
pub fn handoff() -> (mpsc::Sender<Vec<u8>>, MessageStream) {
    let (sender, receiver) = mpsc::channel(HANDOFF_CAPACITY);
    (sender, MessageStream::new(receiver))
}
