pub mod message_service;
pub mod notification_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use message_service::{MessageSendRequest, MessageService, MessageServiceDependencies};
pub use notification_service::{
    NotificationService, NotificationServiceDependencies, NotifyRequest,
};
