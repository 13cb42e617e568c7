use std::sync::Arc;

use application::{Dispatcher, MessageService, NotificationService};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub message_service: Arc<MessageService>,
    pub notification_service: Arc<NotificationService>,
    pub dispatcher: Arc<Dispatcher>,
    pub jwt_service: Arc<JwtService>,
    /// 每个会话推送队列的容量
    pub session_buffer: usize,
}

impl AppState {
    pub fn new(
        message_service: Arc<MessageService>,
        notification_service: Arc<NotificationService>,
        dispatcher: Arc<Dispatcher>,
        jwt_service: Arc<JwtService>,
        session_buffer: usize,
    ) -> Self {
        Self {
            message_service,
            notification_service,
            dispatcher,
            jwt_service,
            session_buffer,
        }
    }
}
