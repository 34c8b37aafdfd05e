//! Flare Message Center Core 错误模块
//!
//! - 数据访问层统一错误类型 `DataError`
//! - 基础设施错误（MongoDB、BSON 序列化）统一转换为 `DataError`

use mongodb::bson;
use thiserror::Error;

/// 数据访问层结果类型
pub type DataResult<T> = std::result::Result<T, DataError>;

/// 数据访问层错误
#[derive(Debug, Error)]
pub enum DataError {
    /// 调用方取消了正在进行的存储操作
    #[error("storage operation cancelled")]
    Cancelled,

    /// 插入的实体主键已存在
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// 实体类型没有在连接仓库中注册集合
    #[error("collection not registered for type {0}")]
    CollectionNotRegistered(String),

    /// 连接字符串没有对应的客户端
    #[error("mongo client not found for database {0}")]
    ClientNotFound(String),

    /// 限流重试次数耗尽
    #[error("rate limited: {remaining} documents not inserted after {attempts} attempts")]
    RateLimitExhausted { remaining: usize, attempts: u32 },

    #[error("invalid data configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to serialize entity: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("failed to deserialize entity: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl DataError {
    /// 是否为取消导致的错误
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DataError::Cancelled)
    }
}
