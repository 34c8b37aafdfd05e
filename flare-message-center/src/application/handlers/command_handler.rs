//! # 消息中心命令处理器（编排层）
//!
//! 负责处理写操作命令，调用领域服务并记录指标

use std::sync::Arc;

use anyhow::Result;
use flare_message_center_core::metrics::MessageCenterMetrics;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::error::BroadcastError;
use crate::domain::model::{
    ClearAllMessages, JoinGroupRequest, JoinGroupResponse, SendMessage, SendMessageResponse,
    UpdateMessageTracker,
};
use crate::domain::service::{BroadcastCenter, SendOutcome, SendReport};

/// 消息中心命令处理器
pub struct MessageCenterCommandHandler {
    center: Arc<BroadcastCenter>,
    metrics: Arc<MessageCenterMetrics>,
    shutdown: CancellationToken,
}

impl MessageCenterCommandHandler {
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

    /// 处理单条发布
    pub async fn handle_send(&self, message: SendMessage) -> Result<SendMessageResponse> {
        debug!(nonce = %message.nonce, "Handling send command");
        let timer = self.metrics.send_duration_seconds.start_timer();
        let result = self
            .center
            .send_message(message, &self.shutdown.child_token())
            .await;
        timer.observe_duration();

        match result {
            Ok(report) => Ok(self.record(report)),
            Err(err) => {
                if matches!(err, BroadcastError::UnsupportedContent(_)) {
                    self.metrics
                        .messages_total
                        .with_label_values(&[SendOutcome::Unsupported.label()])
                        .inc();
                }
                Err(err.into())
            }
        }
    }

    /// 处理批量发布
    pub async fn handle_send_batch(&self, messages: Vec<SendMessage>) -> Result<SendMessageResponse> {
        debug!(count = messages.len(), "Handling batch send command");
        let timer = self.metrics.send_duration_seconds.start_timer();
        let report = self
            .center
            .send_messages(messages, &self.shutdown.child_token())
            .await;
        timer.observe_duration();
        Ok(self.record(report?))
    }

    /// 连接建立：下发客户端 ID
    pub async fn handle_client_connected(&self, connection_id: &str) -> Result<()> {
        self.center.send_client_secret(connection_id).await?;
        Ok(())
    }

    /// 连接断开：移出所有群组
    pub async fn handle_client_disconnected(&self, connection_id: &str) -> Result<()> {
        self.center.leave_group(connection_id).await?;
        Ok(())
    }

    /// 处理加入群组
    pub async fn handle_join_group(&self, request: JoinGroupRequest) -> Result<JoinGroupResponse> {
        let response = self.center.join_group(request).await?;
        let result = if response.error_message.is_none() {
            "joined"
        } else {
            "invalid"
        };
        self.metrics.joins_total.with_label_values(&[result]).inc();
        Ok(response)
    }

    /// 处理阅读进度更新
    pub async fn handle_update_tracker(&self, request: UpdateMessageTracker) -> Result<bool> {
        Ok(self
            .center
            .update_message_tracker(request, &self.shutdown.child_token())
            .await?)
    }

    /// 处理清空消息
    pub async fn handle_clear_all(&self, request: ClearAllMessages) -> Result<bool> {
        Ok(self.center.clear_all_messages(request).await?)
    }

    fn record(&self, report: SendReport) -> SendMessageResponse {
        for outcome in &report.outcomes {
            self.metrics
                .messages_total
                .with_label_values(&[outcome.label()])
                .inc();
            if let SendOutcome::Accepted {
                pushed_groups,
                skipped_groups,
                ..
            } = outcome
            {
                self.metrics.fanout_pushes_total.inc_by(*pushed_groups as u64);
                self.metrics.fanout_skipped_total.inc_by(*skipped_groups as u64);
            }
        }
        report.response
    }
}
