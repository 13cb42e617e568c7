use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageBody, MessageId, Timestamp, UserId};

/// 私信实体。
///
/// delivered 与 seen 为单调标志：一旦置真不再回退。
/// seen_at 只在首次确认已读时写入一次，且只能由收件人触发。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: MessageBody,
    pub sent_at: Timestamp,
    pub delivered: bool,
    pub seen: bool,
    pub seen_at: Option<Timestamp>,
}

impl DirectMessage {
    pub fn new(
        id: MessageId,
        sender_id: UserId,
        recipient_id: UserId,
        body: MessageBody,
        sent_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sender_id,
            recipient_id,
            body,
            sent_at,
            delivered: false,
            seen: false,
            seen_at: None,
        }
    }

    /// 至少一个收件人会话被推送成功后调用。
    pub fn mark_delivered(&mut self) {
        self.delivered = true;
    }

    /// 收件人确认已读。重复调用不改变 seen_at。
    pub fn mark_seen(&mut self, at: Timestamp) {
        if !self.seen {
            self.seen = true;
            self.seen_at = Some(at);
            // 已读必然意味着已送达
            self.delivered = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample() -> DirectMessage {
        DirectMessage::new(
            MessageId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            MessageBody::parse("hello", 100).unwrap(),
            chrono::Utc::now(),
        )
    }

    #[test]
    fn new_message_is_neither_delivered_nor_seen() {
        let message = sample();
        assert!(!message.delivered);
        assert!(!message.seen);
        assert!(message.seen_at.is_none());
    }

    #[test]
    fn mark_seen_is_idempotent_and_keeps_first_timestamp() {
        let mut message = sample();
        let first = chrono::Utc::now();
        message.mark_seen(first);
        let recorded = message.seen_at;

        message.mark_seen(first + chrono::Duration::seconds(30));
        assert!(message.seen);
        assert_eq!(message.seen_at, recorded);
    }

    #[test]
    fn flags_never_reset() {
        let mut message = sample();
        message.mark_delivered();
        message.mark_seen(chrono::Utc::now());
        message.mark_delivered();
        assert!(message.delivered);
        assert!(message.seen);
    }
}
