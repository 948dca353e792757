//! WebSocket 连接中继
//!
//! 每条连接的生命周期状态机：
//!
//! ```text
//! Connecting → Joined → Streaming → Closing → Closed
//! ```
//!
//! - Connecting → Joined：加入频道成员集，失败则直接关闭，连接不会到达 Joined
//! - Joined → Streaming：打开 (用户, 频道) 的消费流，失败同样立即拆除
//! - Streaming：两条相互独立的并发活动——入站帧循环（本任务驱动）与
//!   出站流泵（独立任务）——任一终止即触发拆除
//! - Closing → Closed：无论由哪条活动触发，拆除都会停止两条活动、关闭
//!   消费流、关闭套接字、回收成员关系；每一步失败只记录日志
//!
//! 两条活动之间不共享锁，只通过拆除时的取消信号协调；拆除步骤全部
//! 幂等，双方同时触发也安全。

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// 客户端入站文本帧
///
/// 客户端只能提供消息体；发送者与频道固定为本连接的身份，无法伪造。
#[derive(Debug, Deserialize)]
struct InboundFrame {
    message: String,
}

/// 出站写命令：统一管理所有对 WebSocket sender 的写操作
#[derive(Debug)]
enum WsCommand {
    SendPong(Vec<u8>),
    Close,
}

/// 驱动一条 WebSocket 连接直到关闭
pub async fn serve(mut socket: WebSocket, state: AppState, channel_id: Uuid, user_id: Uuid) {
    // Connecting → Joined
    if let Err(err) = state
        .chat_service
        .add_user_to_channel(channel_id, user_id)
        .await
    {
        warn!(channel_id = %channel_id, user_id = %user_id, error = %err, "加入频道失败，拒绝连接");
        let _ = socket.send(WsMessage::Close(None)).await;
        return;
    }
    debug!(channel_id = %channel_id, user_id = %user_id, state = "joined", "已加入频道");

    // Joined → Streaming
    let mut stream = match state.chat_service.receive_messages(user_id, channel_id).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(channel_id = %channel_id, user_id = %user_id, error = %err, "打开消费流失败，拆除连接");
            let _ = socket.send(WsMessage::Close(None)).await;
            if let Err(err) = state
                .chat_service
                .remove_user_from_channel(channel_id, user_id)
                .await
            {
                warn!(channel_id = %channel_id, user_id = %user_id, error = %err, "回收成员关系失败");
            }
            return;
        }
    };
    debug!(channel_id = %channel_id, user_id = %user_id, state = "streaming", "消费流已打开");

    let (mut sender, mut incoming) = socket.split();
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

    // 出站活动：把消费流与写命令统一写入套接字，保持代理提交的顺序
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                payload = stream.recv() => {
                    let Some(payload) = payload else { break };
                    let text = match String::from_utf8(payload) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(error = %err, "出站负载不是合法 UTF-8，丢弃");
                            continue;
                        }
                    };
                    if sender.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(WsCommand::SendPong(data)) => {
                            if sender.send(WsMessage::Pong(data.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(WsCommand::Close) | None => {
                            let _ = sender.send(WsMessage::Close(None)).await;
                            break;
                        }
                    }
                }
            }
        }
        // 关闭消费流，释放底层游标
        stream.close();
        debug!("出站活动结束");
    });

    // 入站活动：读取客户端帧
    let mut recv_task = tokio::spawn({
        let state = state.clone();
        let cmd_tx = cmd_tx.clone();
        async move {
            while let Some(Ok(frame)) = incoming.next().await {
                match frame {
                    WsMessage::Close(_) => {
                        debug!("收到关闭帧");
                        break;
                    }
                    WsMessage::Text(text) => {
                        let inbound: InboundFrame = match serde_json::from_str(text.as_str()) {
                            Ok(inbound) => inbound,
                            Err(err) => {
                                warn!(error = %err, "入站帧解码失败，结束连接");
                                break;
                            }
                        };
                        if let Err(err) = state
                            .chat_service
                            .send_message(channel_id, user_id, inbound.message)
                            .await
                        {
                            warn!(error = %err, "转发消息失败，结束连接");
                            break;
                        }
                    }
                    WsMessage::Ping(data) => {
                        if cmd_tx.send(WsCommand::SendPong(data.to_vec())).await.is_err() {
                            break;
                        }
                    }
                    WsMessage::Pong(_) => {
                        debug!("收到 pong 帧");
                    }
                    WsMessage::Binary(_) => {
                        debug!("忽略二进制帧");
                    }
                }
            }
            // 通知出站活动发送关闭帧后退出
            let _ = cmd_tx.send(WsCommand::Close).await;
            debug!("入站活动结束");
        }
    });

    // Streaming → Closing：任一活动终止即取消另一条
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            // 入站侧已发出 Close 命令，给出站活动一个干净退出的机会
            let _ = send_task.await;
        }
    }

    // Closing → Closed：回收成员关系，失败只记录日志
    if let Err(err) = state
        .chat_service
        .remove_user_from_channel(channel_id, user_id)
        .await
    {
        warn!(channel_id = %channel_id, user_id = %user_id, error = %err, "回收成员关系失败");
    }

    info!(channel_id = %channel_id, user_id = %user_id, state = "closed", "WebSocket 连接已关闭");
}
