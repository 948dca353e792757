//! 用户实体定义

use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户实体
///
/// 中继核心只依赖用户的身份和展示名，账号体系由外部协作者负责。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// 用户唯一ID
    pub id: Uuid,
    /// 用户名（消息的展示名来源）
    pub username: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 创建新用户
    pub fn new(username: impl Into<String>) -> DomainResult<Self> {
        let username = username.into();
        Self::validate_username(&username)?;

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            username,
            created_at: now,
            updated_at: now,
        })
    }

    /// 修改用户名
    ///
    /// 不回写历史消息中已固化的展示名。
    pub fn rename(&mut self, username: impl Into<String>) -> DomainResult<()> {
        let username = username.into();
        Self::validate_username(&username)?;

        self.username = username;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn validate_username(username: &str) -> DomainResult<()> {
        if username.trim().is_empty() {
            return Err(DomainError::validation_error("username", "用户名不能为空"));
        }
        if username.len() > 255 {
            return Err(DomainError::validation_error(
                "username",
                "用户名不能超过255个字符",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_rejects_empty_username() {
        assert!(User::new("").is_err());
        assert!(User::new("   ").is_err());
    }

    #[test]
    fn test_rename_keeps_id() {
        let mut user = User::new("alice").unwrap();
        let id = user.id;
        user.rename("alice2").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice2");
    }
}
