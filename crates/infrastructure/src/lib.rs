//! 基础设施层
//!
//! 外部协作者的具体实现：PostgreSQL 存储与 Kafka 消息代理桥接。

pub mod db;
pub mod kafka;

pub use db::*;
pub use kafka::*;
