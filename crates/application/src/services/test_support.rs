//! 服务层测试用的内存协作方实现

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use domain::{
    DirectMessage, MessageId, Notification, NotificationId, RepositoryError, Timestamp, UserId,
    UserSummary,
};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::repository::{MessageStore, NotificationStore, UserDirectory};

/// 固定时钟，测试里时间是确定的
pub struct FixedClock(pub Timestamp);

impl FixedClock {
    pub fn at_epoch_hour(hour: u32) -> Self {
        Self(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<UserId, UserSummary>>,
}

impl InMemoryUsers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add(&self, summary: UserSummary) {
        self.users.lock().await.insert(summary.id, summary);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUsers {
    async fn find(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryMessages {
    messages: Mutex<Vec<DirectMessage>>,
}

impl InMemoryMessages {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn get(&self, id: MessageId) -> Option<DirectMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub async fn seed(&self, message: DirectMessage) {
        self.messages.lock().await.push(message);
    }
}

#[async_trait]
impl MessageStore for InMemoryMessages {
    async fn insert(&self, message: DirectMessage) -> Result<DirectMessage, RepositoryError> {
        let mut messages = self.messages.lock().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(RepositoryError::Conflict);
        }
        messages.push(message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<DirectMessage>, RepositoryError> {
        Ok(self.get(id).await)
    }

    async fn update_delivery_state(
        &self,
        id: MessageId,
        delivered: bool,
        seen: bool,
        seen_at: Option<Timestamp>,
    ) -> Result<(), RepositoryError> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepositoryError::NotFound)?;
        message.delivered = delivered;
        message.seen = seen;
        message.seen_at = seen_at;
        Ok(())
    }

    async fn list_undelivered(
        &self,
        recipient_id: UserId,
    ) -> Result<Vec<DirectMessage>, RepositoryError> {
        let messages = self.messages.lock().await;
        let mut pending: Vec<DirectMessage> = messages
            .iter()
            .filter(|m| m.recipient_id == recipient_id && !m.delivered)
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.sent_at);
        Ok(pending)
    }
}

/// 每次调用都失败的消息存储，模拟存储不可用。
/// 用于验证落库失败时操作在任何推送发生之前就中止。
pub struct UnavailableMessages;

#[async_trait]
impl MessageStore for UnavailableMessages {
    async fn insert(&self, _message: DirectMessage) -> Result<DirectMessage, RepositoryError> {
        Err(RepositoryError::storage("message store unavailable"))
    }

    async fn find_by_id(&self, _id: MessageId) -> Result<Option<DirectMessage>, RepositoryError> {
        Err(RepositoryError::storage("message store unavailable"))
    }

    async fn update_delivery_state(
        &self,
        _id: MessageId,
        _delivered: bool,
        _seen: bool,
        _seen_at: Option<Timestamp>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::storage("message store unavailable"))
    }

    async fn list_undelivered(
        &self,
        _recipient_id: UserId,
    ) -> Result<Vec<DirectMessage>, RepositoryError> {
        Err(RepositoryError::storage("message store unavailable"))
    }
}

/// 每次调用都失败的通知存储
pub struct UnavailableNotifications;

#[async_trait]
impl NotificationStore for UnavailableNotifications {
    async fn insert(&self, _notification: Notification) -> Result<Notification, RepositoryError> {
        Err(RepositoryError::storage("notification store unavailable"))
    }

    async fn find_by_id(
        &self,
        _id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        Err(RepositoryError::storage("notification store unavailable"))
    }

    async fn mark_read(&self, _id: NotificationId) -> Result<(), RepositoryError> {
        Err(RepositoryError::storage("notification store unavailable"))
    }

    async fn mark_all_read(&self, _user_id: UserId) -> Result<u64, RepositoryError> {
        Err(RepositoryError::storage("notification store unavailable"))
    }

    async fn count_unread(&self, _user_id: UserId) -> Result<u64, RepositoryError> {
        Err(RepositoryError::storage("notification store unavailable"))
    }
}

#[derive(Default)]
pub struct InMemoryNotifications {
    notifications: Mutex<Vec<Notification>>,
}

impl InMemoryNotifications {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn get(&self, id: NotificationId) -> Option<Notification> {
        self.notifications
            .lock()
            .await
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    pub async fn seed(&self, notification: Notification) {
        self.notifications.lock().await.push(notification);
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotifications {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        self.notifications.lock().await.push(notification.clone());
        Ok(notification)
    }

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        Ok(self.get(id).await)
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(RepositoryError::NotFound)?;
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let mut updated = 0;
        for notification in notifications
            .iter_mut()
            .filter(|n| n.target_user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn count_unread(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let notifications = self.notifications.lock().await;
        Ok(notifications
            .iter()
            .filter(|n| n.target_user_id == user_id && !n.is_read)
            .count() as u64)
    }
}
