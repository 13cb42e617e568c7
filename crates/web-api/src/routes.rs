//! 路由定义
//!
//! WebSocket 握手在升级前完成 JWT 校验，未认证的连接
//! 不会升级，也就永远不会出现在注册表里。

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::state::AppState;
use crate::ws_connection::WsConnection;

/// WebSocket 连接查询参数
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token
    pub token: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response, StatusCode> {
    let claims = state.jwt_service.verify_token(&query.token).map_err(|_| {
        warn!("websocket upgrade rejected: invalid token");
        StatusCode::UNAUTHORIZED
    })?;

    let user_id = claims.user_id;
    Ok(ws.on_upgrade(move |socket| async move {
        WsConnection::new(state, user_id).run(socket).await;
    }))
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let registry = state.dispatcher.registry();
    Json(json!({
        "status": "ok",
        "online_users": registry.online_user_count().await,
        "active_sessions": registry.session_count().await,
    }))
}
