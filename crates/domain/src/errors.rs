//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 验证错误
    #[error("invalid argument: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 消息不存在
    #[error("message not found")]
    MessageNotFound,

    /// 通知不存在
    #[error("notification not found")]
    NotificationNotFound,

    /// 触发者不存在（不允许创建指向已消失用户的通知）
    #[error("actor not found")]
    ActorNotFound,

    /// 只有收件人可以确认消息已读
    #[error("only the recipient may acknowledge a message")]
    NotMessageRecipient,

    /// 只有通知的目标用户可以标记已读
    #[error("only the owner may mark a notification read")]
    NotNotificationOwner,

    /// 会话状态不允许该操作
    #[error("session is not in state {expected}")]
    InvalidSessionState { expected: &'static str },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
