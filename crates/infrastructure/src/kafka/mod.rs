//! Kafka 消息代理桥接
//!
//! 每个频道对应一个主题；以频道ID作为分区键保证频道内消息有序。

pub mod consumer;
pub mod error;
pub mod producer;

pub use error::*;
pub use producer::*;

use application::event_bus::{BrokerError, EventBus, MessageStream};
use async_trait::async_trait;
use config::KafkaConfig;
use uuid::Uuid;

/// 基于 Kafka 的事件总线
pub struct KafkaEventBus {
    producer: KafkaMessageProducer,
    config: KafkaConfig,
}

impl KafkaEventBus {
    pub fn new(config: KafkaConfig) -> KafkaResult<Self> {
        let producer = KafkaMessageProducer::new(&config)?;
        Ok(Self { producer, config })
    }

    /// 频道对应的主题名
    fn topic(&self, channel_id: Uuid) -> String {
        format!("{}-{}", self.config.topic_prefix, channel_id)
    }
}

#[async_trait]
impl EventBus for KafkaEventBus {
    async fn publish(&self, channel_id: Uuid, payload: &[u8]) -> Result<(), BrokerError> {
        let topic = self.topic(channel_id);
        self.producer
            .publish(&topic, &channel_id.to_string(), payload)
            .await
            .map_err(|err| BrokerError::publish(err.to_string()))
    }

    async fn subscribe(&self, group: &str, channel_id: Uuid) -> Result<MessageStream, BrokerError> {
        let topic = self.topic(channel_id);
        consumer::open_stream(&self.config, group, &topic)
            .map_err(|err| BrokerError::subscribe(err.to_string()))
    }
}
