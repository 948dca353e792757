//! 频道实体定义
//!
//! 频道是消息路由的单位，持有一个不含重复用户的成员集。

use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 频道实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// 频道唯一ID
    pub id: Uuid,
    /// 频道名称
    pub name: String,
    /// 成员集（用户ID，不含重复）
    pub members: Vec<Uuid>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
    /// 软删除时间（已删除的频道对新加入不可见）
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Channel {
    /// 创建新频道，发起者自动成为首个成员
    pub fn new(name: impl Into<String>, founder_id: Uuid) -> DomainResult<Self> {
        let name = name.into();
        Self::validate_name(&name)?;

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            members: vec![founder_id],
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// 加入成员
    ///
    /// 幂等操作：重复加入已存在的成员不改变成员集，返回 false。
    pub fn add_member(&mut self, user_id: Uuid) -> bool {
        if self.members.contains(&user_id) {
            return false;
        }
        self.members.push(user_id);
        self.updated_at = Utc::now();
        true
    }

    /// 移除成员
    ///
    /// 移除不存在的成员是无操作，返回 false。
    pub fn remove_member(&mut self, user_id: Uuid) -> bool {
        let Some(index) = self.members.iter().position(|id| *id == user_id) else {
            return false;
        };
        self.members.remove(index);
        self.updated_at = Utc::now();
        true
    }

    /// 判断用户是否为频道成员
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    /// 成员集是否为空（空频道在宽限期后可被删除）
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// 标记软删除
    pub fn mark_deleted(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// 是否已被软删除
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn validate_name(name: &str) -> DomainResult<()> {
        if name.trim().is_empty() {
            return Err(DomainError::validation_error("name", "频道名称不能为空"));
        }
        if name.len() > 255 {
            return Err(DomainError::validation_error(
                "name",
                "频道名称不能超过255个字符",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_channel_contains_founder() {
        let founder = Uuid::new_v4();
        let channel = Channel::new("general", founder).unwrap();
        assert_eq!(channel.members, vec![founder]);
        assert!(!channel.is_deleted());
    }

    #[test]
    fn test_add_member_is_idempotent() {
        let founder = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut channel = Channel::new("general", founder).unwrap();

        assert!(channel.add_member(other));
        assert!(!channel.add_member(other));
        assert_eq!(channel.members.len(), 2);
    }

    #[test]
    fn test_remove_absent_member_is_noop() {
        let founder = Uuid::new_v4();
        let mut channel = Channel::new("general", founder).unwrap();

        assert!(!channel.remove_member(Uuid::new_v4()));
        assert_eq!(channel.members.len(), 1);
    }

    #[test]
    fn test_membership_never_contains_duplicates() {
        let founder = Uuid::new_v4();
        let mut channel = Channel::new("general", founder).unwrap();
        channel.add_member(founder);
        channel.add_member(founder);

        let mut seen = channel.members.clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), channel.members.len());
    }

    #[test]
    fn test_remove_last_member_leaves_empty_set() {
        let founder = Uuid::new_v4();
        let mut channel = Channel::new("general", founder).unwrap();

        assert!(channel.remove_member(founder));
        assert!(channel.is_empty());
    }
}
