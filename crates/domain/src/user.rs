use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 用户目录返回的展示信息摘要。
///
/// 消息和通知的载荷中都会嵌入触发者的摘要。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl UserSummary {
    pub fn new(id: UserId, display_name: impl Into<String>, avatar_url: Option<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            avatar_url,
        }
    }
}
