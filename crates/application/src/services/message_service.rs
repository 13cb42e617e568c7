//! 私信通道服务
//!
//! 实现点对点私信的核心业务逻辑：发送、已读确认、重连补推。
//! 先持久化后推送是硬性顺序，任何事件都不会在落库前被推出去。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{
    DirectMessage, DomainError, MessageBody, MessageId, MessagePayload, PushEvent, SessionId,
    UserId, UserSummary,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dispatcher::Dispatcher,
    error::{ApplicationError, ApplicationResult},
    repository::{MessageStore, UserDirectory},
};

/// 发送私信命令
#[derive(Debug, Clone)]
pub struct MessageSendRequest {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub text: String,
    /// 发起发送的会话，回显时跳过它；服务端内部调用可为 None
    pub origin_session: Option<SessionId>,
}

pub struct MessageServiceDependencies {
    pub message_store: Arc<dyn MessageStore>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub clock: Arc<dyn Clock>,
    pub dispatcher: Arc<Dispatcher>,
    /// 消息正文最大字符数
    pub max_message_chars: usize,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    async fn sender_summary(&self, sender_id: UserId) -> ApplicationResult<UserSummary> {
        self.deps
            .user_directory
            .find(sender_id)
            .await?
            .ok_or_else(|| ApplicationError::Domain(DomainError::ActorNotFound))
    }

    /// 发送私信。
    ///
    /// 校验 -> 落库（delivered=false, seen=false）-> 推送收件人会话
    /// 与发送者其他设备 -> 至少推送成功一个收件人会话时回写 delivered。
    /// 收件人完全离线时 delivered 保持 false，等对方下次拉取历史。
    pub async fn send(&self, request: MessageSendRequest) -> ApplicationResult<DirectMessage> {
        let sender_id = UserId::from(request.sender_id);
        let recipient_id = UserId::from(request.recipient_id);

        let body = MessageBody::parse(request.text, self.deps.max_message_chars)?;
        let sender = self.sender_summary(sender_id).await?;

        let message = DirectMessage::new(
            MessageId::from(Uuid::new_v4()),
            sender_id,
            recipient_id,
            body,
            self.deps.clock.now(),
        );

        let mut stored = self.deps.message_store.insert(message).await?;

        let payload = MessagePayload::from_message(&stored, sender);

        // 收件人与发送者其他设备收到的是两种不同的事件
        let recipient_pushes = self
            .deps
            .dispatcher
            .deliver(recipient_id, PushEvent::MessageReceived(payload.clone()))
            .await;

        match request.origin_session {
            Some(origin) => {
                self.deps
                    .dispatcher
                    .deliver_excluding(sender_id, origin, PushEvent::MessageSent(payload))
                    .await
            }
            None => {
                self.deps
                    .dispatcher
                    .deliver(sender_id, PushEvent::MessageSent(payload))
                    .await
            }
        };

        if recipient_pushes > 0 {
            stored.mark_delivered();
            self.deps
                .message_store
                .update_delivery_state(stored.id, true, stored.seen, stored.seen_at)
                .await?;
        }

        info!(
            message_id = %stored.id,
            sender_id = %sender_id,
            recipient_id = %recipient_id,
            delivered = stored.delivered,
            "direct message sent"
        );
        Ok(stored)
    }

    /// 收件人确认已读。
    ///
    /// 只有收件人可以确认；对已读消息重复确认是幂等的空操作，
    /// 返回现有状态且不再发回执。首次确认后向原发送者推已读回执。
    pub async fn mark_seen(
        &self,
        message_id: Uuid,
        acking_user: Uuid,
    ) -> ApplicationResult<DirectMessage> {
        let message_id = MessageId::from(message_id);
        let acking_user = UserId::from(acking_user);

        let mut message = self
            .deps
            .message_store
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound)?;

        if message.recipient_id != acking_user {
            return Err(DomainError::NotMessageRecipient.into());
        }

        if message.seen {
            return Ok(message);
        }

        let seen_at = self.deps.clock.now();
        message.mark_seen(seen_at);
        self.deps
            .message_store
            .update_delivery_state(message.id, message.delivered, true, message.seen_at)
            .await?;

        self.deps
            .dispatcher
            .deliver(
                message.sender_id,
                PushEvent::MessageRead {
                    message_id: message.id,
                    seen_at,
                },
            )
            .await;

        debug!(message_id = %message.id, "read receipt dispatched");
        Ok(message)
    }

    /// 重连补推：把收件人所有未送达消息按发送顺序推到刚激活的会话。
    /// 推送成功的消息回写 delivered。返回补推成功条数。
    pub async fn push_pending(
        &self,
        user_id: Uuid,
        session_id: SessionId,
    ) -> ApplicationResult<usize> {
        let user_id = UserId::from(user_id);
        let pending = self.deps.message_store.list_undelivered(user_id).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut summaries: HashMap<UserId, UserSummary> = HashMap::new();
        let mut pushed = 0usize;

        for mut message in pending {
            let sender = match summaries.get(&message.sender_id) {
                Some(summary) => summary.clone(),
                None => match self.deps.user_directory.find(message.sender_id).await? {
                    Some(summary) => {
                        summaries.insert(message.sender_id, summary.clone());
                        summary
                    }
                    // 发送者已注销：跳过补推，消息仍可由历史拉取读到
                    None => continue,
                },
            };

            let payload = MessagePayload::from_message(&message, sender);
            if self
                .deps
                .dispatcher
                .push_to_session(session_id, PushEvent::MessageReceived(payload))
                .await
            {
                message.mark_delivered();
                self.deps
                    .message_store
                    .update_delivery_state(message.id, true, message.seen, message.seen_at)
                    .await?;
                pushed += 1;
            }
        }

        if pushed > 0 {
            info!(user_id = %user_id, pushed, "pending messages pushed on reconnect");
        }
        Ok(pushed)
    }
}
