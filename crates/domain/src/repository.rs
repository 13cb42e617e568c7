//! 持久化层错误契约
//!
//! 存储适配器统一通过这些类型向上层报告失败。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 目标记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一性冲突
    #[error("record conflict")]
    Conflict,

    /// 存储不可用或查询失败
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
