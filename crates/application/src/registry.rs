//! 连接注册表
//!
//! 维护用户身份到活跃会话集合的映射，支持同一用户多设备在线。
//! 进程内状态，跨实例部署需要外部广播协作方，不在此处理。

use std::collections::{HashMap, HashSet};

use domain::{SessionId, UserId};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Default)]
struct RegistryInner {
    user_sessions: HashMap<UserId, HashSet<SessionId>>,
    session_owner: HashMap<SessionId, UserId>,
}

/// 内存连接注册表
///
/// 两个映射由同一把锁保护，register/unregister/active_sessions
/// 彼此线性化，快照读不会观察到半注册的会话。
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// 注册会话。对相同的 (user_id, session_id) 重复调用是幂等的。
    /// 会话的归属用户不可变，归属不一致的重复注册会被拒绝。
    pub async fn register(&self, user_id: UserId, session_id: SessionId) {
        let mut inner = self.inner.write().await;

        if let Some(owner) = inner.session_owner.get(&session_id) {
            if *owner != user_id {
                warn!(
                    session_id = %session_id,
                    owner = %owner,
                    attempted = %user_id,
                    "refusing to re-register session under a different user"
                );
            }
            return;
        }

        inner.session_owner.insert(session_id, user_id);
        inner
            .user_sessions
            .entry(user_id)
            .or_default()
            .insert(session_id);

        debug!(user_id = %user_id, session_id = %session_id, "session registered");
    }

    /// 注销会话。会话不存在时静默返回，断连竞争是预期情况不是错误。
    pub async fn unregister(&self, session_id: SessionId) {
        let mut inner = self.inner.write().await;

        let Some(user_id) = inner.session_owner.remove(&session_id) else {
            return;
        };

        if let Some(sessions) = inner.user_sessions.get_mut(&user_id) {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                inner.user_sessions.remove(&user_id);
            }
        }

        debug!(user_id = %user_id, session_id = %session_id, "session unregistered");
    }

    /// 用户当前活跃会话的快照。未知或离线用户返回空集合。
    pub async fn active_sessions(&self, user_id: UserId) -> Vec<SessionId> {
        let inner = self.inner.read().await;
        inner
            .user_sessions
            .get(&user_id)
            .map(|sessions| sessions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 在线用户数
    pub async fn online_user_count(&self) -> usize {
        self.inner.read().await.user_sessions.len()
    }

    /// 活跃会话总数
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.session_owner.len()
    }
}
