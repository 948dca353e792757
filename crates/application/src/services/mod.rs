//! 应用层服务

pub mod chat_service;

pub use chat_service::*;
