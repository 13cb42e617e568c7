//! Web API 层。
//!
//! 提供 Axum 路由，将 WebSocket 连接委托给应用层的用例服务。

mod auth;
mod error;
mod routes;
mod state;
mod ws_connection;

pub use auth::{Claims, JwtService};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
pub use ws_connection::{ClientFrame, ServerFrame};
