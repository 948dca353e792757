//! 消息实体定义

use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 聊天消息实体
///
/// 消息一经创建即不可变，唯一允许的修改是原地编辑消息体：
/// 同一ID，刷新 `updated_at`，`created_at` 保持不变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 消息唯一ID
    pub id: Uuid,
    /// 所属频道ID
    pub channel_id: Uuid,
    /// 发送者ID
    pub sender_id: Uuid,
    /// 发送者展示名（写入时固化，不跟随用户改名）
    pub sender_name: String,
    /// 消息体
    #[serde(rename = "message")]
    pub content: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl ChatMessage {
    /// 创建新消息
    pub fn new(
        channel_id: Uuid,
        sender_id: Uuid,
        sender_name: impl Into<String>,
        content: impl Into<String>,
    ) -> DomainResult<Self> {
        let content = content.into();
        Self::validate_content(&content)?;

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            channel_id,
            sender_id,
            sender_name: sender_name.into(),
            content,
            created_at: now,
            updated_at: now,
        })
    }

    /// 原地编辑消息体
    pub fn edit_content(&mut self, content: impl Into<String>) -> DomainResult<()> {
        let content = content.into();
        Self::validate_content(&content)?;

        self.content = content;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn validate_content(content: &str) -> DomainResult<()> {
        if content.is_empty() {
            return Err(DomainError::validation_error("message", "消息体不能为空"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_keeps_identity_and_creation_time() {
        let mut message =
            ChatMessage::new(Uuid::new_v4(), Uuid::new_v4(), "alice", "hello").unwrap();
        let id = message.id;
        let created_at = message.created_at;

        message.edit_content("hello again").unwrap();

        assert_eq!(message.id, id);
        assert_eq!(message.created_at, created_at);
        assert!(message.updated_at >= created_at);
        assert_eq!(message.content, "hello again");
    }

    #[test]
    fn test_empty_content_is_rejected() {
        assert!(ChatMessage::new(Uuid::new_v4(), Uuid::new_v4(), "alice", "").is_err());
    }

    #[test]
    fn test_wire_format_uses_original_field_names() {
        let message = ChatMessage::new(Uuid::new_v4(), Uuid::new_v4(), "alice", "hi").unwrap();
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("message").is_some());
        assert!(json.get("sender_name").is_some());
        assert!(json.get("content").is_none());
    }
}
