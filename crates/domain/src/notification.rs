//! 通知实体定义

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{NotificationId, Timestamp, UserId};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Message,
    /// 未知类型走通用兜底文案，反序列化不失败
    #[serde(other)]
    Other,
}

impl NotificationKind {
    /// 根据类型和触发者展示名渲染通知文案。
    /// 模板是固定的，渲染结果确定。
    pub fn render(&self, actor_name: &str) -> String {
        match self {
            NotificationKind::Like => format!("{} liked your post", actor_name),
            NotificationKind::Comment => format!("{} commented on your post", actor_name),
            NotificationKind::Follow => format!("{} started following you", actor_name),
            NotificationKind::Message => format!("{} sent you a message", actor_name),
            NotificationKind::Other => "New notification".to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Message => "message",
            NotificationKind::Other => "other",
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(s: &str) -> Self {
        match s {
            "like" => NotificationKind::Like,
            "comment" => NotificationKind::Comment,
            "follow" => NotificationKind::Follow,
            "message" => NotificationKind::Message,
            _ => NotificationKind::Other,
        }
    }
}

/// 通知实体
///
/// 由通知推送服务在领域事件发生时创建，只有目标用户可以标记已读。
/// is_read 单调：false -> true，不回退。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub target_user_id: UserId,
    pub kind: NotificationKind,
    pub actor_id: UserId,
    /// 关联对象（例如帖子ID），关注类通知没有
    pub subject_id: Option<Uuid>,
    /// 渲染后的通知文案
    pub body: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(
        id: NotificationId,
        target_user_id: UserId,
        kind: NotificationKind,
        actor_id: UserId,
        subject_id: Option<Uuid>,
        body: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            target_user_id,
            kind,
            actor_id,
            subject_id,
            body,
            is_read: false,
            created_at,
        }
    }

    /// 标记为已读，重复调用是无害的
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_uses_fixed_templates() {
        assert_eq!(
            NotificationKind::Like.render("Alice"),
            "Alice liked your post"
        );
        assert_eq!(
            NotificationKind::Follow.render("Bob"),
            "Bob started following you"
        );
        assert_eq!(NotificationKind::Other.render("Carol"), "New notification");
    }

    #[test]
    fn unknown_kind_deserializes_to_other() {
        let kind: NotificationKind = serde_json::from_str("\"mention\"").unwrap();
        assert_eq!(kind, NotificationKind::Other);
    }
}
