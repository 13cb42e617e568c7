//! 通知推送服务
//!
//! 领域事件（点赞、评论、关注、私信）触发的站内通知：
//! 渲染文案、持久化、再尽力推送到目标用户的活跃会话。
//! 推送失败不影响通知本身的创建结果。

use std::sync::Arc;

use domain::{
    DomainError, Notification, NotificationId, NotificationKind, NotificationPayload, PushEvent,
    UserId,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dispatcher::Dispatcher,
    error::ApplicationResult,
    repository::{NotificationStore, UserDirectory},
};

/// 创建通知命令
#[derive(Debug, Clone)]
pub struct NotifyRequest {
    pub target_user_id: Uuid,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    /// 关联对象（帖子、评论等），关注类通知没有
    pub subject_id: Option<Uuid>,
}

pub struct NotificationServiceDependencies {
    pub notification_store: Arc<dyn NotificationStore>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub clock: Arc<dyn Clock>,
    pub dispatcher: Arc<Dispatcher>,
}

pub struct NotificationService {
    deps: NotificationServiceDependencies,
}

impl NotificationService {
    pub fn new(deps: NotificationServiceDependencies) -> Self {
        Self { deps }
    }

    /// 创建并推送通知。
    ///
    /// 触发者必须存在（文案要用其展示名）。落库在推送之前，
    /// 目标用户离线时通知静默留在未读列表里。
    /// 不过滤自触发事件，是否通知自己由上游调用方决定。
    pub async fn notify(&self, request: NotifyRequest) -> ApplicationResult<Notification> {
        let target_user_id = UserId::from(request.target_user_id);
        let actor_id = UserId::from(request.actor_id);

        let actor = self
            .deps
            .user_directory
            .find(actor_id)
            .await?
            .ok_or(DomainError::ActorNotFound)?;

        let body = request.kind.render(&actor.display_name);
        let notification = Notification::new(
            NotificationId::from(Uuid::new_v4()),
            target_user_id,
            request.kind,
            actor_id,
            request.subject_id,
            body,
            self.deps.clock.now(),
        );

        let stored = self.deps.notification_store.insert(notification).await?;

        let payload = NotificationPayload::from_notification(&stored, actor);
        let delivered = self
            .deps
            .dispatcher
            .deliver(target_user_id, PushEvent::NotificationReceived(payload))
            .await;

        info!(
            notification_id = %stored.id,
            target_user_id = %target_user_id,
            kind = request.kind.as_str(),
            delivered,
            "notification created"
        );
        Ok(stored)
    }

    /// 标记单条通知为已读。只有目标用户可以标记；
    /// 对已读通知重复标记是幂等的空操作。
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        acting_user: Uuid,
    ) -> ApplicationResult<Notification> {
        let notification_id = NotificationId::from(notification_id);
        let acting_user = UserId::from(acting_user);

        let mut notification = self
            .deps
            .notification_store
            .find_by_id(notification_id)
            .await?
            .ok_or(DomainError::NotificationNotFound)?;

        if notification.target_user_id != acting_user {
            return Err(DomainError::NotNotificationOwner.into());
        }

        if notification.is_read {
            return Ok(notification);
        }

        notification.mark_read();
        self.deps.notification_store.mark_read(notification.id).await?;

        debug!(notification_id = %notification.id, "notification marked read");
        Ok(notification)
    }

    /// 一次性标记用户的所有未读通知为已读，返回受影响条数。
    pub async fn mark_all_read(&self, user_id: Uuid) -> ApplicationResult<u64> {
        let user_id = UserId::from(user_id);
        let updated = self.deps.notification_store.mark_all_read(user_id).await?;
        if updated > 0 {
            debug!(user_id = %user_id, updated, "all notifications marked read");
        }
        Ok(updated)
    }

    /// 用户当前未读通知数。
    pub async fn unread_count(&self, user_id: Uuid) -> ApplicationResult<u64> {
        let count = self
            .deps
            .notification_store
            .count_unread(UserId::from(user_id))
            .await?;
        Ok(count)
    }
}
