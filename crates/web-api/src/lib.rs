//! Web API 层
//!
//! HTTP 路由与 WebSocket 连接中继。

pub mod error;
pub mod routes;
pub mod state;
pub mod ws_connection;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
