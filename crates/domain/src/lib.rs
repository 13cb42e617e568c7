//! 实时消息系统核心领域模型
//!
//! 包含私信、通知、在线用户等核心实体，以及相关的业务规则。

pub mod errors;
pub mod events;
pub mod message;
pub mod notification;
pub mod repository;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use errors::{DomainError, DomainResult};
pub use events::{MessagePayload, NotificationPayload, PushEvent};
pub use message::DirectMessage;
pub use notification::{Notification, NotificationKind};
pub use repository::{RepositoryError, RepositoryResult};
pub use user::UserSummary;
pub use value_objects::{MessageBody, MessageId, NotificationId, SessionId, Timestamp, UserId};
