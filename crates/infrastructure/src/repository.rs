//! Postgres adapters for the application-layer stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use application::{MessageStore, NotificationStore, UserDirectory};
use domain::{
    DirectMessage, MessageBody, MessageId, Notification, NotificationId, NotificationKind,
    RepositoryError, Timestamp, UserId, UserSummary,
};

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        other => RepositoryError::storage(other.to_string()),
    }
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    display_name: String,
    avatar_url: Option<String>,
}

impl From<UserRecord> for UserSummary {
    fn from(value: UserRecord) -> Self {
        UserSummary {
            id: UserId::from(value.id),
            display_name: value.display_name,
            avatar_url: value.avatar_url,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    body: String,
    sent_at: DateTime<Utc>,
    delivered: bool,
    seen: bool,
    seen_at: Option<DateTime<Utc>>,
}

impl From<MessageRecord> for DirectMessage {
    fn from(value: MessageRecord) -> Self {
        DirectMessage {
            id: MessageId::from(value.id),
            sender_id: UserId::from(value.sender_id),
            recipient_id: UserId::from(value.recipient_id),
            body: MessageBody::from_trusted(value.body),
            sent_at: value.sent_at,
            delivered: value.delivered,
            seen: value.seen,
            seen_at: value.seen_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct NotificationRecord {
    id: Uuid,
    target_user_id: Uuid,
    kind: String,
    actor_id: Uuid,
    subject_id: Option<Uuid>,
    body: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for Notification {
    fn from(value: NotificationRecord) -> Self {
        Notification {
            id: NotificationId::from(value.id),
            target_user_id: UserId::from(value.target_user_id),
            kind: NotificationKind::from(value.kind.as_str()),
            actor_id: UserId::from(value.actor_id),
            subject_id: value.subject_id,
            body: value.body,
            is_read: value.is_read,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, display_name, avatar_url FROM users WHERE id = $1"#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(UserSummary::from))
    }
}

#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(&self, message: DirectMessage) -> Result<DirectMessage, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO direct_messages (id, sender_id, recipient_id, body, sent_at, delivered, seen, seen_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, sender_id, recipient_id, body, sent_at, delivered, seen, seen_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.sender_id))
        .bind(Uuid::from(message.recipient_id))
        .bind(message.body.as_str())
        .bind(message.sent_at)
        .bind(message.delivered)
        .bind(message.seen)
        .bind(message.seen_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(DirectMessage::from(record))
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<DirectMessage>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"SELECT id, sender_id, recipient_id, body, sent_at, delivered, seen, seen_at
               FROM direct_messages WHERE id = $1"#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(DirectMessage::from))
    }

    async fn update_delivery_state(
        &self,
        id: MessageId,
        delivered: bool,
        seen: bool,
        seen_at: Option<Timestamp>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE direct_messages
            SET delivered = $2, seen = $3, seen_at = COALESCE(seen_at, $4)
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .bind(delivered)
        .bind(seen)
        .bind(seen_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_undelivered(
        &self,
        recipient_id: UserId,
    ) -> Result<Vec<DirectMessage>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"SELECT id, sender_id, recipient_id, body, sent_at, delivered, seen, seen_at
               FROM direct_messages
               WHERE recipient_id = $1 AND delivered = FALSE
               ORDER BY sent_at ASC"#,
        )
        .bind(Uuid::from(recipient_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(DirectMessage::from).collect())
    }
}

#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            INSERT INTO notifications (id, target_user_id, kind, actor_id, subject_id, body, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, target_user_id, kind, actor_id, subject_id, body, is_read, created_at
            "#,
        )
        .bind(Uuid::from(notification.id))
        .bind(Uuid::from(notification.target_user_id))
        .bind(notification.kind.as_str())
        .bind(Uuid::from(notification.actor_id))
        .bind(notification.subject_id)
        .bind(&notification.body)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(Notification::from(record))
    }

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"SELECT id, target_user_id, kind, actor_id, subject_id, body, is_read, created_at
               FROM notifications WHERE id = $1"#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Notification::from))
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"UPDATE notifications SET is_read = TRUE WHERE id = $1"#)
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE notifications SET is_read = TRUE
               WHERE target_user_id = $1 AND is_read = FALSE"#,
        )
        .bind(Uuid::from(user_id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn count_unread(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM notifications
               WHERE target_user_id = $1 AND is_read = FALSE"#,
        )
        .bind(Uuid::from(user_id))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
