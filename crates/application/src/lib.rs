//! 应用层
//!
//! 组合领域模型与外部协作者，暴露中继编排器 `ChatService`，
//! 以及消息代理的抽象接口 `EventBus`。

pub mod errors;
pub mod event_bus;
pub mod local_bus;
pub mod services;

pub use errors::*;
pub use event_bus::*;
pub use local_bus::*;
pub use services::*;
