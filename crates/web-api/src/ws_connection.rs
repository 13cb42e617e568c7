//! WebSocket 连接生命周期
//!
//! 封装单条连接的状态和逻辑：会话激活、重连补推、
//! 客户端帧分发、推送事件下发和断开清理。

use std::sync::Arc;

use application::PresenceSession;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{PushEvent, UserId};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// 客户端发来的帧
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// 发送私信
    SendMessage { recipient_id: Uuid, text: String },
    /// 确认已读
    MarkSeen { message_id: Uuid },
    /// 输入中指示
    Typing { recipient_id: Uuid },
    /// 标记单条通知已读
    MarkNotificationRead { notification_id: Uuid },
    /// 标记所有通知已读
    MarkAllNotificationsRead,
    /// 应用层心跳
    Ping,
}

/// 服务端回发的控制帧。业务事件直接以 `PushEvent` 的线格式下发。
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerFrame {
    #[serde(rename = "pong")]
    Pong,
    /// 只回给发起操作的会话
    #[serde(rename = "error")]
    Error {
        code: &'static str,
        message: String,
    },
}

/// WebSocket 写操作命令
///
/// 使用命令模式统一管理所有对 WebSocket sender 的写操作
#[derive(Debug)]
enum WsCommand {
    SendText(String),
    SendPong(Vec<u8>),
}

pub struct WsConnection {
    state: AppState,
    user_id: Uuid,
}

impl WsConnection {
    pub fn new(state: AppState, user_id: Uuid) -> Self {
        Self { state, user_id }
    }

    /// 运行连接的主循环，返回时连接已清理完毕。
    pub async fn run(self, socket: WebSocket) {
        let session = Arc::new(PresenceSession::new(
            UserId::from(self.user_id),
            self.state.dispatcher.clone(),
        ));

        let (push_tx, mut push_rx) = mpsc::channel::<PushEvent>(self.state.session_buffer);
        if let Err(err) = session.activate(push_tx).await {
            warn!(user_id = %self.user_id, error = %err, "session activation failed");
            return;
        }

        let (mut sender, mut incoming) = socket.split();
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let send_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        let Some(cmd) = cmd else { break };
                        let message = match cmd {
                            WsCommand::SendText(text) => WsMessage::Text(text.into()),
                            WsCommand::SendPong(data) => WsMessage::Pong(data.into()),
                        };
                        if sender.send(message).await.is_err() {
                            break;
                        }
                    }
                    event = push_rx.recv() => {
                        let Some(event) = event else { break };
                        let payload = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(err) => {
                                warn!(error = %err, "failed to serialize push event");
                                continue;
                            }
                        };
                        if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // 重连补推：离线期间积压的未送达消息先推下去。
        // 发送任务已在排空推送队列，积压超过队列容量也不会卡住补推。
        match self
            .state
            .message_service
            .push_pending(self.user_id, session.id())
            .await
        {
            Ok(pushed) if pushed > 0 => {
                debug!(user_id = %self.user_id, pushed, "backlog pushed to new session")
            }
            Ok(_) => {}
            Err(err) => {
                warn!(user_id = %self.user_id, error = %err, "backlog push failed");
            }
        }

        // 接收任务：处理来自客户端的帧
        let recv_task = {
            let state = self.state.clone();
            let session = session.clone();
            let user_id = self.user_id;
            tokio::spawn(async move {
                while let Some(Ok(message)) = incoming.next().await {
                    match message {
                        WsMessage::Text(text) => {
                            handle_frame(&state, &session, user_id, text.as_str(), &cmd_tx).await;
                        }
                        WsMessage::Ping(data) => {
                            if cmd_tx
                                .send(WsCommand::SendPong(data.to_vec()))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        WsMessage::Close(_) => break,
                        WsMessage::Binary(_) | WsMessage::Pong(_) => {}
                    }
                }
            })
        };

        // 任意一侧结束即认为连接断开
        tokio::select! {
            _ = send_task => {}
            _ = recv_task => {}
        }

        session.close().await;
        info!(user_id = %self.user_id, session_id = %session.id(), "connection closed");
    }
}

/// 解析并执行一条客户端帧。业务错误只回给发起的会话，不断开连接。
async fn handle_frame(
    state: &AppState,
    session: &Arc<PresenceSession>,
    user_id: Uuid,
    text: &str,
    cmd_tx: &mpsc::Sender<WsCommand>,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            send_error(
                cmd_tx,
                ApiError::bad_request(format!("malformed frame: {}", err)),
            )
            .await;
            return;
        }
    };

    match frame {
        ClientFrame::SendMessage { recipient_id, text } => {
            let request = application::MessageSendRequest {
                sender_id: user_id,
                recipient_id,
                text,
                origin_session: Some(session.id()),
            };
            if let Err(err) = state.message_service.send(request).await {
                send_error(cmd_tx, err.into()).await;
            }
        }
        ClientFrame::MarkSeen { message_id } => {
            if let Err(err) = state.message_service.mark_seen(message_id, user_id).await {
                send_error(cmd_tx, err.into()).await;
            }
        }
        ClientFrame::Typing { recipient_id } => {
            session.relay_typing(UserId::from(recipient_id)).await;
        }
        ClientFrame::MarkNotificationRead { notification_id } => {
            if let Err(err) = state
                .notification_service
                .mark_read(notification_id, user_id)
                .await
            {
                send_error(cmd_tx, err.into()).await;
            }
        }
        ClientFrame::MarkAllNotificationsRead => {
            if let Err(err) = state.notification_service.mark_all_read(user_id).await {
                send_error(cmd_tx, err.into()).await;
            }
        }
        ClientFrame::Ping => {
            let pong = serde_json::to_string(&ServerFrame::Pong)
                .unwrap_or_else(|_| r#"{"event":"pong"}"#.to_string());
            let _ = cmd_tx.send(WsCommand::SendText(pong)).await;
        }
    }
}

async fn send_error(cmd_tx: &mpsc::Sender<WsCommand>, error: ApiError) {
    let frame = ServerFrame::Error {
        code: error.code(),
        message: error.message().to_string(),
    };
    match serde_json::to_string(&frame) {
        Ok(payload) => {
            let _ = cmd_tx.send(WsCommand::SendText(payload)).await;
        }
        Err(err) => warn!(error = %err, "failed to serialize error frame"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_deserialize_by_type_tag() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"type":"SendMessage","recipient_id":"6ffb1135-7e5a-4372-8c1c-31bd7914d9ae","text":"hi"}"#,
        )
        .unwrap();
        assert!(matches!(frame, ClientFrame::SendMessage { .. }));

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"MarkAllNotificationsRead"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::MarkAllNotificationsRead));

        let frame: ClientFrame = serde_json::from_str(r#"{"type":"Ping"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Ping));
    }

    #[test]
    fn unknown_frame_type_is_rejected() {
        let result: Result<ClientFrame, _> =
            serde_json::from_str(r#"{"type":"SelfDestruct"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn server_frames_serialize_with_event_tag() {
        let json = serde_json::to_value(ServerFrame::Pong).unwrap();
        assert_eq!(json["event"], "pong");

        let json = serde_json::to_value(ServerFrame::Error {
            code: "MESSAGE_NOT_FOUND",
            message: "message not found".to_string(),
        })
        .unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["code"], "MESSAGE_NOT_FOUND");
    }
}
