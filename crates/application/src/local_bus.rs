//! 本地内存消息代理
//!
//! 在单进程内提供与外部代理相同的语义：按主题保留的只追加日志、
//! 按消费组提交的读取偏移量、至少一次投递。用于测试，也可在没有
//! Kafka 的环境下单实例运行。

use crate::event_bus::{handoff, BrokerError, EventBus, MessageStream};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Default)]
struct BusState {
    /// 每个频道主题的保留日志
    logs: HashMap<Uuid, Vec<Vec<u8>>>,
    /// (消费组, 频道) 已提交的偏移量
    offsets: HashMap<(String, Uuid), usize>,
}

/// 本地事件总线
#[derive(Clone)]
pub struct LocalEventBus {
    state: Arc<Mutex<BusState>>,
    version: Arc<watch::Sender<u64>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            version: Arc::new(version),
        }
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for LocalEventBus {
    async fn publish(&self, channel_id: Uuid, payload: &[u8]) -> Result<(), BrokerError> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| BrokerError::publish("总线状态锁中毒"))?;
            state.logs.entry(channel_id).or_default().push(payload.to_vec());
        }
        // 唤醒所有等待新消息的消费任务
        self.version.send_modify(|v| *v += 1);
        Ok(())
    }

    async fn subscribe(&self, group: &str, channel_id: Uuid) -> Result<MessageStream, BrokerError> {
        let (tx, stream) = handoff();
        let state = self.state.clone();
        let mut version = self.version.subscribe();
        let group_key = (group.to_string(), channel_id);

        tokio::spawn(async move {
            loop {
                // 读取该消费组下一条未提交的日志项
                let next = {
                    let guard = match state.lock() {
                        Ok(guard) => guard,
                        Err(_) => break,
                    };
                    let offset = guard.offsets.get(&group_key).copied().unwrap_or(0);
                    guard
                        .logs
                        .get(&channel_id)
                        .and_then(|log| log.get(offset).cloned())
                        .map(|payload| (offset, payload))
                };

                match next {
                    Some((offset, payload)) => {
                        // 有界交接：消费端未就绪时在此阻塞
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                        // 交付后提交偏移量。同组的其他订阅可能已经推进了
                        // 游标，此时不再提交：重复投递合法，跳过不合法
                        if let Ok(mut guard) = state.lock() {
                            let entry = guard.offsets.entry(group_key.clone()).or_insert(0);
                            if *entry == offset {
                                *entry = offset + 1;
                            }
                        }
                    }
                    None => {
                        tokio::select! {
                            changed = version.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                            _ = tx.closed() => break,
                        }
                    }
                }
            }
            tracing::debug!(group = %group_key.0, channel_id = %channel_id, "本地消费任务结束");
        });

        Ok(stream)
    }
}
