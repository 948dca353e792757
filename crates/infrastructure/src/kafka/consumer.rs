//! Kafka 消息消费者
//!
//! 为每个订阅创建独立的消费者，通过容量为 1 的交接通道把拉取到的
//! 负载交给消费流：消费端变慢时背压直接传导到代理拉取。

use crate::kafka::{KafkaError, KafkaResult};
use application::event_bus::{handoff, MessageStream};
use config::KafkaConfig;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 打开 (消费组, 主题) 的消费流
///
/// 从最早保留的偏移量开始读取；每条消息在交付给消费流之后立即提交
/// 偏移量（至少一次语义）。流被关闭或丢弃时，拉取任务在两次拉取
/// 之间观察到取消并释放消费者。
pub fn open_stream(config: &KafkaConfig, group: &str, topic: &str) -> KafkaResult<MessageStream> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("group.id", group)
        .set("bootstrap.servers", config.brokers.join(","))
        .set("enable.partition.eof", "false")
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("allow.auto.create.topics", "true")
        .set("session.timeout.ms", config.session_timeout_ms.to_string())
        .create()
        .map_err(|e| KafkaError::ConfigError {
            message: format!("创建 Kafka 消费者失败: {}", e),
        })?;

    consumer
        .subscribe(&[topic])
        .map_err(|e| KafkaError::ConsumerError {
            message: format!("订阅主题失败: {}", e),
        })?;

    info!(group = %group, topic = %topic, "消费者已注册");

    let (tx, stream) = handoff();
    tokio::spawn(fetch_loop(consumer, tx, topic.to_string()));

    Ok(stream)
}

async fn fetch_loop(consumer: StreamConsumer, tx: mpsc::Sender<Vec<u8>>, topic: String) {
    loop {
        let fetched = tokio::select! {
            result = consumer.recv() => result,
            // 合作式取消：流关闭后在下一次拉取边界退出
            _ = tx.closed() => break,
        };

        let (payload, partition, offset) = match fetched {
            Ok(message) => (
                message.payload().map(<[u8]>::to_vec),
                message.partition(),
                message.offset(),
            ),
            Err(err) => {
                warn!(topic = %topic, error = %err, "拉取消息失败");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        let Some(payload) = payload else { continue };

        // 有界交接：消费端未就绪时在此阻塞
        if tx.send(payload).await.is_err() {
            break;
        }

        // 交付后立即提交偏移量
        let mut tpl = TopicPartitionList::new();
        if tpl
            .add_partition_offset(&topic, partition, Offset::Offset(offset + 1))
            .is_ok()
        {
            if let Err(err) = consumer.commit(&tpl, CommitMode::Async) {
                warn!(topic = %topic, error = %err, "提交偏移量失败");
            }
        }
    }

    debug!(topic = %topic, "消费任务结束，释放消费者");
}
