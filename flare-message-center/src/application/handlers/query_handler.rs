//! # 消息中心查询处理器
//!
//! 负责消息回放查询

use std::sync::Arc;

use anyhow::Result;
use flare_message_center_core::metrics::MessageCenterMetrics;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::model::{GetMessages, MessagePack};
use crate::domain::service::BroadcastCenter;

/// 消息中心查询处理器
pub struct MessageCenterQueryHandler {
    center: Arc<BroadcastCenter>,
    metrics: Arc<MessageCenterMetrics>,
    shutdown: CancellationToken,
}

impl MessageCenterQueryHandler {
    pub fn new(
        center: Arc<BroadcastCenter>,
        metrics: Arc<MessageCenterMetrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            center,
            metrics,
            shutdown,
        }
    }

    /// 处理重连同步查询
    pub async fn handle_sync_message(&self, request: GetMessages) -> Result<MessagePack> {
        debug!(user_id = %request.user_id, group = %request.from_group, "Handling sync query");
        self.metrics
            .replay_requests_total
            .with_label_values(&["sync"])
            .inc();
        Ok(self
            .center
            .sync_message(request, &self.shutdown.child_token())
            .await?)
    }

    /// 处理加载更多查询
    pub async fn handle_get_more_messages(&self, request: GetMessages) -> Result<MessagePack> {
        debug!(user_id = %request.user_id, group = %request.from_group, "Handling get-more query");
        self.metrics
            .replay_requests_total
            .with_label_values(&["get_more"])
            .inc();
        Ok(self
            .center
            .get_more_messages(request, &self.shutdown.child_token())
            .await?)
    }
}
