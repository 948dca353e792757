//! Kafka 消息生产者
//!
//! 使用频道ID作为分区键，确保同一频道消息的有序性。

use crate::kafka::{KafkaError, KafkaResult};
use config::KafkaConfig;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::info;

/// Kafka 消息生产者
pub struct KafkaMessageProducer {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaMessageProducer {
    /// 创建新的 Kafka 生产者
    pub fn new(config: &KafkaConfig) -> KafkaResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.brokers.join(","))
            .set("message.timeout.ms", config.send_timeout_ms.to_string())
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .create()
            .map_err(|e| KafkaError::ConfigError {
                message: format!("创建 Kafka 生产者失败: {}", e),
            })?;

        info!("Kafka 生产者创建成功，连接到: {}", config.brokers.join(","));

        Ok(Self {
            producer,
            send_timeout: Duration::from_millis(config.send_timeout_ms),
        })
    }

    /// 向主题追加一条消息
    ///
    /// 不做重试；发送失败原样返回给调用方。
    pub async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> KafkaResult<()> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        self.producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map_err(|(err, _)| KafkaError::ProducerError {
                message: format!("发送消息失败: {}", err),
            })?;

        Ok(())
    }
}
