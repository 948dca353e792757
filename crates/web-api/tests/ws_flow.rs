//! WebSocket 连接中继的端到端流程测试
//!
//! 覆盖连接生命周期：加入后帧可达、客户端关闭后成员关系被回收、
//! 入站帧无法解码时服务端结束连接并回收成员关系。

mod support;

use std::time::Duration;

use domain::entities::User;
use domain::repositories::{ChannelRepository, UserRepository};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message as TungsteniteMessage};
use uuid::Uuid;

use support::{build_app, spawn_server, TestApp};

/// 轮询等待用户离开频道成员集，拆除是异步完成的
async fn wait_until_removed(app: &TestApp, channel_id: Uuid, user_id: Uuid) -> bool {
    for _ in 0..50 {
        sleep(Duration::from_millis(50)).await;
        match app.channels.find_by_id(channel_id).await.unwrap() {
            Some(channel) if channel.has_member(user_id) => {}
            _ => return true,
        }
    }
    false
}

#[tokio::test]
async fn test_join_then_frame_delivery() {
    let app = build_app();
    let alice = app.users.create(User::new("alice").unwrap()).await.unwrap();
    let bob = app.users.create(User::new("bob").unwrap()).await.unwrap();
    let channel = app.service.start_channel(alice.id, "general").await.unwrap();

    let addr = spawn_server(app.router).await;
    sleep(Duration::from_millis(100)).await;

    let url = format!("ws://{}/ws/chat/{}/user/{}", addr, channel.id, bob.id);
    let (mut socket, _) = connect_async(&url).await.expect("connect");
    sleep(Duration::from_millis(100)).await;

    // 连接建立即加入成员集
    let stored = app.channels.find_by_id(channel.id).await.unwrap().unwrap();
    assert!(stored.has_member(bob.id));

    socket
        .send(TungsteniteMessage::Text(
            json!({ "message": "hi" }).to_string().into(),
        ))
        .await
        .expect("send");

    let frame = timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("等待帧超时")
        .expect("连接提前结束")
        .expect("读取帧失败");
    let body: serde_json::Value =
        serde_json::from_str(frame.to_text().expect("文本帧")).expect("解码帧");

    assert_eq!(body["message"], "hi");
    assert_eq!(body["sender_name"], "bob");
    assert_eq!(body["channel_id"], json!(channel.id));
}

#[tokio::test]
async fn test_client_close_reverts_membership() {
    let app = build_app();
    let alice = app.users.create(User::new("alice").unwrap()).await.unwrap();
    let bob = app.users.create(User::new("bob").unwrap()).await.unwrap();
    let channel = app.service.start_channel(alice.id, "general").await.unwrap();

    let addr = spawn_server(app.router.clone()).await;
    sleep(Duration::from_millis(100)).await;

    let url = format!("ws://{}/ws/chat/{}/user/{}", addr, channel.id, bob.id);
    let (mut socket, _) = connect_async(&url).await.expect("connect");
    sleep(Duration::from_millis(100)).await;
    assert!(app
        .channels
        .find_by_id(channel.id)
        .await
        .unwrap()
        .unwrap()
        .has_member(bob.id));

    socket.close(None).await.expect("close");

    assert!(wait_until_removed(&app, channel.id, bob.id).await);
    // 频道本身还有 alice，不会被删除
    assert!(app.channels.find_by_id(channel.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_undecodable_inbound_frame_tears_down_connection() {
    let app = build_app();
    let alice = app.users.create(User::new("alice").unwrap()).await.unwrap();
    let bob = app.users.create(User::new("bob").unwrap()).await.unwrap();
    let channel = app.service.start_channel(alice.id, "general").await.unwrap();

    let addr = spawn_server(app.router.clone()).await;
    sleep(Duration::from_millis(100)).await;

    let url = format!("ws://{}/ws/chat/{}/user/{}", addr, channel.id, bob.id);
    let (mut socket, _) = connect_async(&url).await.expect("connect");
    sleep(Duration::from_millis(100)).await;

    socket
        .send(TungsteniteMessage::Text("not json".into()))
        .await
        .expect("send");

    // 服务端结束连接：收到关闭帧或流终止
    let ended = loop {
        match timeout(Duration::from_secs(2), socket.next()).await {
            Ok(Some(Ok(TungsteniteMessage::Close(_)))) | Ok(Some(Err(_))) | Ok(None) => {
                break true
            }
            Ok(Some(Ok(_))) => {}
            Err(_) => break false,
        }
    };
    assert!(ended);

    // 拆除回收成员关系
    assert!(wait_until_removed(&app, channel.id, bob.id).await);
}
