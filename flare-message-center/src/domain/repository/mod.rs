//! 领域端口定义
//!
//! 消息与阅读进度的存储直接使用公共库的 `Repository<T>`，这里只定义推送与 ID 生成端口。

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::model::ClientEvent;

/// 单个连接或整个群组的推送句柄
#[async_trait]
pub trait ClientProxy: Send + Sync {
    async fn send(&self, event: ClientEvent) -> Result<()>;
}

/// 群组推送能力（连接注册与群组成员关系由实现方维护）
#[async_trait]
pub trait GroupBroadcaster: Send + Sync {
    /// 按连接 ID 获取推送句柄；连接不存在返回 None
    fn client(&self, connection_id: &str) -> Option<Arc<dyn ClientProxy>>;

    /// 按客户端密钥解析连接
    fn user(&self, secret: &str) -> Option<Arc<dyn ClientProxy>>;

    /// 按群组名获取推送句柄；群组没有成员时返回 None
    fn group(&self, group_name: &str) -> Option<Arc<dyn ClientProxy>>;

    /// 把连接加入群组
    async fn add_to_group(&self, connection_id: &str, group_name: &str) -> Result<()>;

    /// 把连接从所有群组移除
    async fn remove_from_groups(&self, connection_id: &str) -> Result<()>;
}

/// 消息 ID 生成器
pub trait MessageIdGenerator: Send + Sync {
    /// 返回严格递增的 ID
    fn next_id(&self) -> i64;
}
