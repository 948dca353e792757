//! 聊天频道中继的核心领域模型
//!
//! 包含用户、频道、消息实体，领域错误，以及存储层的抽象接口。

pub mod entities;
pub mod errors;
pub mod repositories;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use repositories::*;
