//! 推送事件线格式
//!
//! 投递到目标用户活跃会话上的事件载荷。收件人与发送者的其他设备
//! 收到的是两种不同的事件（received / sent），不是同一事件的重复。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::DirectMessage;
use crate::notification::{Notification, NotificationKind};
use crate::user::UserSummary;
use crate::value_objects::{MessageId, NotificationId, Timestamp, UserId};

/// 私信事件载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub sender: UserSummary,
    pub text: String,
    pub delivered: bool,
    pub seen: bool,
    pub sent_at: Timestamp,
    pub seen_at: Option<Timestamp>,
}

impl MessagePayload {
    pub fn from_message(message: &DirectMessage, sender: UserSummary) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            sender,
            text: message.body.as_str().to_string(),
            delivered: message.delivered,
            seen: message.seen,
            sent_at: message.sent_at,
            seen_at: message.seen_at,
        }
    }
}

/// 通知事件载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub actor: UserSummary,
    pub subject_id: Option<Uuid>,
    pub message: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl NotificationPayload {
    pub fn from_notification(notification: &Notification, actor: UserSummary) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            actor,
            subject_id: notification.subject_id,
            message: notification.body.clone(),
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

/// 推送到会话的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PushEvent {
    /// 收件人收到新私信
    #[serde(rename = "message.received")]
    MessageReceived(MessagePayload),

    /// 发送者的其他设备收到"已发出"回显
    #[serde(rename = "message.sent")]
    MessageSent(MessagePayload),

    /// 已读回执，发给原发送者
    #[serde(rename = "message.read")]
    MessageRead {
        message_id: MessageId,
        seen_at: Timestamp,
    },

    /// 输入中指示，临时事件不持久化
    #[serde(rename = "typing")]
    Typing { from_user_id: UserId },

    /// 新通知
    #[serde(rename = "notification.received")]
    NotificationReceived(NotificationPayload),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_dotted_names() {
        let event = PushEvent::Typing {
            from_user_id: UserId::new(Uuid::new_v4()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "typing");

        let event = PushEvent::MessageRead {
            message_id: MessageId::new(Uuid::new_v4()),
            seen_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "message.read");
        assert!(json["data"]["message_id"].is_string());
    }

    #[test]
    fn notification_payload_exposes_kind_as_type() {
        let actor = UserSummary::new(UserId::new(Uuid::new_v4()), "Alice", None);
        let notification = Notification::new(
            NotificationId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            NotificationKind::Like,
            actor.id,
            Some(Uuid::new_v4()),
            NotificationKind::Like.render(&actor.display_name),
            chrono::Utc::now(),
        );
        let payload = NotificationPayload::from_notification(&notification, actor);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "like");
        assert_eq!(json["message"], "Alice liked your post");
    }
}
