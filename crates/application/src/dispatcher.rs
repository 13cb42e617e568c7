//! 事件分发器
//!
//! "推送给用户 X 的所有活跃会话"这一原语的进程内实现。
//! 私信通道和通知推送共用这里的扇出逻辑。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain::{PushEvent, SessionId, UserId};
use futures_util::future::join_all;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::registry::ConnectionRegistry;

/// 默认单次推送超时，防止个别死连接拖慢整次扇出
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// 事件分发器
///
/// 持有每个会话的发送端。单个会话推送失败只记录日志并计数，
/// 不会中断同一次扇出中对其余会话的投递，也不会上抛给调用方。
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    senders: RwLock<HashMap<SessionId, mpsc::Sender<PushEvent>>>,
    push_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self::with_push_timeout(registry, DEFAULT_PUSH_TIMEOUT)
    }

    pub fn with_push_timeout(registry: Arc<ConnectionRegistry>, push_timeout: Duration) -> Self {
        Self {
            registry,
            senders: RwLock::new(HashMap::new()),
            push_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// 会话激活时挂上发送端
    pub async fn register_sender(&self, session_id: SessionId, sender: mpsc::Sender<PushEvent>) {
        let mut senders = self.senders.write().await;
        senders.insert(session_id, sender);
    }

    /// 会话关闭时摘除发送端
    pub async fn unregister_sender(&self, session_id: SessionId) {
        let mut senders = self.senders.write().await;
        senders.remove(&session_id);
    }

    /// 向用户的所有活跃会话投递事件，返回成功推送的会话数。
    pub async fn deliver(&self, user_id: UserId, event: PushEvent) -> usize {
        self.fan_out(user_id, None, event).await
    }

    /// 同 deliver，但跳过发起操作的那个会话（多设备回显用）。
    pub async fn deliver_excluding(
        &self,
        user_id: UserId,
        except: SessionId,
        event: PushEvent,
    ) -> usize {
        self.fan_out(user_id, Some(except), event).await
    }

    /// 定向推送到单个会话（重连补推用）。
    pub async fn push_to_session(&self, session_id: SessionId, event: PushEvent) -> bool {
        let sender = {
            let senders = self.senders.read().await;
            senders.get(&session_id).cloned()
        };
        match sender {
            Some(sender) => self.push_one(session_id, &sender, event).await,
            None => false,
        }
    }

    async fn fan_out(
        &self,
        user_id: UserId,
        except: Option<SessionId>,
        event: PushEvent,
    ) -> usize {
        let sessions = self.registry.active_sessions(user_id).await;
        if sessions.is_empty() {
            return 0;
        }

        // 先取快照再推送，避免在持锁状态下等待慢客户端
        let targets: Vec<(SessionId, mpsc::Sender<PushEvent>)> = {
            let senders = self.senders.read().await;
            sessions
                .into_iter()
                .filter(|id| Some(*id) != except)
                .filter_map(|id| senders.get(&id).map(|sender| (id, sender.clone())))
                .collect()
        };

        let pushes = targets
            .iter()
            .map(|(session_id, sender)| self.push_one(*session_id, sender, event.clone()));
        let delivered = join_all(pushes)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();

        debug!(user_id = %user_id, delivered, "event fan-out completed");
        delivered
    }

    /// 单次推送，超时或通道关闭都算该会话失败，与其余会话隔离。
    async fn push_one(
        &self,
        session_id: SessionId,
        sender: &mpsc::Sender<PushEvent>,
        event: PushEvent,
    ) -> bool {
        match tokio::time::timeout(self.push_timeout, sender.send(event)).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                warn!(session_id = %session_id, "push failed: session channel closed");
                false
            }
            Err(_) => {
                warn!(session_id = %session_id, "push failed: timed out");
                false
            }
        }
    }
}
