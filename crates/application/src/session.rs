//! 会话生命周期
//!
//! 一条连接的状态机：Connecting -> Active -> Closed。
//! Closed 是终态，迟到的调用被静默丢弃，关闭与错误并发触发时
//! 清理只执行一次。

use std::sync::Arc;

use domain::{DomainError, DomainResult, PushEvent, SessionId, UserId};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::dispatcher::Dispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// 单条连接的在线会话。
///
/// 连接建立时身份已由外部认证协作方验证，未认证的连接
/// 不会构造出会话，也就永远不会进入注册表。
pub struct PresenceSession {
    id: SessionId,
    user_id: UserId,
    dispatcher: Arc<Dispatcher>,
    state: Mutex<SessionState>,
}

impl PresenceSession {
    pub fn new(user_id: UserId, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            id: SessionId::generate(),
            user_id,
            dispatcher,
            state: Mutex::new(SessionState::Connecting),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Connecting -> Active：挂上推送通道并登记到注册表。
    pub async fn activate(&self, sender: mpsc::Sender<PushEvent>) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        if *state != SessionState::Connecting {
            return Err(DomainError::InvalidSessionState {
                expected: "connecting",
            });
        }

        self.dispatcher.register_sender(self.id, sender).await;
        self.dispatcher.registry().register(self.user_id, self.id).await;
        *state = SessionState::Active;

        info!(user_id = %self.user_id, session_id = %self.id, "session active");
        Ok(())
    }

    /// Active -> Closed。状态转换在锁内判定，因此并发的
    /// close/错误信号只有一个会执行清理；重复关闭是无害的。
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if *state == SessionState::Closed {
            return;
        }
        let was_active = *state == SessionState::Active;
        *state = SessionState::Closed;

        if was_active {
            self.dispatcher.unregister_sender(self.id).await;
            self.dispatcher.registry().unregister(self.id).await;
        }

        info!(user_id = %self.user_id, session_id = %self.id, "session closed");
    }

    /// 输入中指示：尽力而为、至多一次、不持久化。
    /// 会话不在 Active 状态或对方离线时静默丢弃。
    pub async fn relay_typing(&self, to_user: UserId) {
        if self.state().await != SessionState::Active {
            return;
        }
        let delivered = self
            .dispatcher
            .deliver(
                to_user,
                PushEvent::Typing {
                    from_user_id: self.user_id,
                },
            )
            .await;
        debug!(
            from = %self.user_id,
            to = %to_user,
            delivered,
            "typing indicator relayed"
        );
    }
}
