//! 外部协作方接口
//!
//! 持久化与用户目录由外部适配器实现，核心只依赖这些抽象。

use async_trait::async_trait;
use domain::{
    DirectMessage, MessageId, Notification, NotificationId, RepositoryError, Timestamp, UserId,
    UserSummary,
};

/// 用户目录查询
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 查找用户展示摘要，用户不存在时返回 None
    async fn find(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError>;
}

/// 私信存储
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// 持久化新消息，返回存储后的完整对象
    async fn insert(&self, message: DirectMessage) -> Result<DirectMessage, RepositoryError>;

    async fn find_by_id(&self, id: MessageId) -> Result<Option<DirectMessage>, RepositoryError>;

    /// 更新送达/已读状态
    async fn update_delivery_state(
        &self,
        id: MessageId,
        delivered: bool,
        seen: bool,
        seen_at: Option<Timestamp>,
    ) -> Result<(), RepositoryError>;

    /// 收件人的所有未送达消息，按发送时间升序（用于重连补推）
    async fn list_undelivered(
        &self,
        recipient_id: UserId,
    ) -> Result<Vec<DirectMessage>, RepositoryError>;
}

/// 通知存储
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError>;

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError>;

    /// 标记单条通知为已读，重复标记是无害的
    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError>;

    /// 标记用户所有未读通知为已读，返回受影响条数
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError>;

    /// 未读通知数量
    async fn count_unread(&self, user_id: UserId) -> Result<u64, RepositoryError>;
}
