//! In-memory implementations of the collaborator traits.
//!
//! Used by integration tests and local development where a Postgres
//! instance is not available. Same observable behavior as the Pg
//! adapters, state lives in process memory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use application::{MessageStore, NotificationStore, UserDirectory};
use domain::{
    DirectMessage, MessageId, Notification, NotificationId, RepositoryError, Timestamp, UserId,
    UserSummary,
};

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserSummary>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn upsert(&self, summary: UserSummary) {
        self.users.write().await.insert(summary.id, summary);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<DirectMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: DirectMessage) -> Result<DirectMessage, RepositoryError> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(RepositoryError::Conflict);
        }
        messages.push(message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<DirectMessage>, RepositoryError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn update_delivery_state(
        &self,
        id: MessageId,
        delivered: bool,
        seen: bool,
        seen_at: Option<Timestamp>,
    ) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepositoryError::NotFound)?;
        message.delivered = delivered;
        message.seen = seen;
        // 与 Pg 适配器一致：首个 seen_at 不被覆盖
        if message.seen_at.is_none() {
            message.seen_at = seen_at;
        }
        Ok(())
    }

    async fn list_undelivered(
        &self,
        recipient_id: UserId,
    ) -> Result<Vec<DirectMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        let mut pending: Vec<DirectMessage> = messages
            .iter()
            .filter(|m| m.recipient_id == recipient_id && !m.delivered)
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.sent_at);
        Ok(pending)
    }
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        if notifications.iter().any(|n| n.id == notification.id) {
            return Err(RepositoryError::Conflict);
        }
        notifications.push(notification.clone());
        Ok(notification)
    }

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(RepositoryError::NotFound)?;
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.write().await;
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
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| n.target_user_id == user_id && !n.is_read)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::MessageBody;
    use uuid::Uuid;

    fn message(recipient: UserId) -> DirectMessage {
        DirectMessage::new(
            MessageId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            recipient,
            MessageBody::parse("hello", 100).unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_message_id() {
        let store = InMemoryMessageStore::new();
        let message = message(UserId::new(Uuid::new_v4()));
        store.insert(message.clone()).await.unwrap();
        assert!(matches!(
            store.insert(message).await,
            Err(RepositoryError::Conflict)
        ));
    }

    #[tokio::test]
    async fn update_keeps_first_seen_timestamp() {
        let store = InMemoryMessageStore::new();
        let recipient = UserId::new(Uuid::new_v4());
        let message = store.insert(message(recipient)).await.unwrap();

        let first = Utc::now();
        store
            .update_delivery_state(message.id, true, true, Some(first))
            .await
            .unwrap();
        store
            .update_delivery_state(
                message.id,
                true,
                true,
                Some(first + chrono::Duration::minutes(5)),
            )
            .await
            .unwrap();

        let stored = store.find_by_id(message.id).await.unwrap().unwrap();
        assert_eq!(stored.seen_at, Some(first));
    }

    #[tokio::test]
    async fn undelivered_listing_excludes_delivered() {
        let store = InMemoryMessageStore::new();
        let recipient = UserId::new(Uuid::new_v4());
        let kept = store.insert(message(recipient)).await.unwrap();
        let flipped = store.insert(message(recipient)).await.unwrap();

        store
            .update_delivery_state(flipped.id, true, false, None)
            .await
            .unwrap();

        let pending = store.list_undelivered(recipient).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, kept.id);
    }
}
