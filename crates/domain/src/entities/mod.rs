//! 领域实体定义

pub mod channel;
pub mod message;
pub mod user;

pub use channel::*;
pub use message::*;
pub use user::*;
