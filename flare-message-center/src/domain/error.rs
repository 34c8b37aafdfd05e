//! 消息中心领域错误

use flare_message_center_core::DataError;
use thiserror::Error;

/// 加入群组失败时返回的错误信息
pub const INVALID_JOIN_MESSAGE: &str = "Invalid message, some parameters are invalid or missing";

/// 领域服务错误
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// 消息内容类型无法处理
    #[error("unsupported message content: {0}")]
    UnsupportedContent(String),

    #[error("{0} is not supported")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Store(#[from] DataError),

    /// 推送通道错误
    #[error("broadcaster error: {0}")]
    Broadcaster(#[from] anyhow::Error),
}

pub type BroadcastResult<T> = std::result::Result<T, BroadcastError>;

/// 在响应中以失败标记返回、不向上抛出的拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejection {
    #[error("Nonce, Filter and TargetGroup can't be null or empty.")]
    Validation,

    #[error("Duplicated message.")]
    Duplicate,
}

impl SendRejection {
    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            SendRejection::Validation => "invalid",
            SendRejection::Duplicate => "duplicate",
        }
    }
}
