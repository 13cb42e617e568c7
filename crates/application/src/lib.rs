//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：私信通道、通知推送、
//! 连接注册表与分发器，以及对外部适配器（用户目录、存储）的抽象。

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod repository;
pub mod services;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use dispatcher::Dispatcher;
pub use error::{ApplicationError, ApplicationResult};
pub use registry::ConnectionRegistry;
pub use repository::{MessageStore, NotificationStore, UserDirectory};
pub use services::{
    MessageSendRequest, MessageService, MessageServiceDependencies, NotificationService,
    NotificationServiceDependencies, NotifyRequest,
};
pub use session::{PresenceSession, SessionState};
