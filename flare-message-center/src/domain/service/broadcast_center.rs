//! 广播中心领域服务
//!
//! 发布流程：校验 → 去重 → 持久化 → 向所有目标群组推送。
//! 回放与阅读进度直接基于通用仓储查询。

use std::sync::Arc;

use chrono::Duration;
use flare_message_center_core::data::{Filter, ID_FIELD, Repository, SortKey};
use flare_message_center_core::{DateTimeService, distinct_ordered, is_blank};
use futures::future::join_all;
use mongodb::bson::{self, Bson};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{BroadcastError, BroadcastResult, INVALID_JOIN_MESSAGE, SendRejection};
use crate::domain::model::{
    ClearAllMessages, ClientEvent, GetMessages, JoinGroupRequest, JoinGroupResponse,
    MessageContent, MessageFilter, MessageInfo, MessagePack, MessageTrack, MessageView,
    SendMessage, SendMessageResponse, UpdateMessageTracker,
};
use crate::domain::repository::{GroupBroadcaster, MessageIdGenerator};
use crate::domain::validation::Validate;

/// 默认去重窗口（分钟）
pub const DEFAULT_DEDUP_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct BroadcastCenterOptions {
    /// 同一 nonce 在该时间窗口内只接受一次
    pub dedup_window: Duration,
}

impl Default for BroadcastCenterOptions {
    fn default() -> Self {
        Self {
            dedup_window: Duration::minutes(DEFAULT_DEDUP_WINDOW_MINUTES),
        }
    }
}

/// 单条消息的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted {
        message_id: i64,
        pushed_groups: usize,
        skipped_groups: usize,
    },
    Rejected(SendRejection),
    Unsupported,
    /// 存储或推送出错，该条消息未被接受
    Failed,
}

impl SendOutcome {
    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            SendOutcome::Accepted { .. } => "accepted",
            SendOutcome::Rejected(rejection) => rejection.label(),
            SendOutcome::Unsupported => "unsupported",
            SendOutcome::Failed => "error",
        }
    }
}

/// 发布报告：对外响应 + 每条消息的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    pub response: SendMessageResponse,
    pub outcomes: Vec<SendOutcome>,
}

impl SendReport {
    fn single(response: SendMessageResponse, outcome: SendOutcome) -> Self {
        Self {
            response,
            outcomes: vec![outcome],
        }
    }
}

/// 广播中心
pub struct BroadcastCenter {
    messages: Arc<dyn Repository<MessageInfo>>,
    tracks: Arc<dyn Repository<MessageTrack>>,
    broadcaster: Arc<dyn GroupBroadcaster>,
    clock: Arc<dyn DateTimeService>,
    id_generator: Arc<dyn MessageIdGenerator>,
    options: BroadcastCenterOptions,
}

impl BroadcastCenter {
    pub fn new(
        messages: Arc<dyn Repository<MessageInfo>>,
        tracks: Arc<dyn Repository<MessageTrack>>,
        broadcaster: Arc<dyn GroupBroadcaster>,
        clock: Arc<dyn DateTimeService>,
        id_generator: Arc<dyn MessageIdGenerator>,
        options: BroadcastCenterOptions,
    ) -> Self {
        Self {
            messages,
            tracks,
            broadcaster,
            clock,
            id_generator,
            options,
        }
    }

    pub fn options(&self) -> &BroadcastCenterOptions {
        &self.options
    }

    /// 发布单条消息
    ///
    /// 校验失败和重复 nonce 以失败标记返回；无法识别的内容类型返回错误。
    #[instrument(skip(self, message, cancel), fields(nonce = %message.nonce))]
    pub async fn send_message(
        &self,
        message: SendMessage,
        cancel: &CancellationToken,
    ) -> BroadcastResult<SendReport> {
        if !message.is_valid() {
            warn!("Rejecting invalid message");
            return Ok(reject(&message.nonce, SendRejection::Validation));
        }

        if self.is_duplicate(&message.nonce, cancel).await? {
            warn!("Rejecting duplicated message");
            return Ok(reject(&message.nonce, SendRejection::Duplicate));
        }

        if matches!(message.content, MessageContent::Unsupported) {
            return Err(BroadcastError::UnsupportedContent(
                "Not support this message content".to_string(),
            ));
        }

        let SendMessage {
            nonce,
            filter,
            target_groups,
            content,
        } = message;
        let filter = filter.unwrap_or_default();
        let filter = MessageFilter {
            scopes: distinct_ordered(filter.scopes),
            activities: distinct_ordered(filter.activities),
        };

        let record = MessageInfo {
            id: self.id_generator.next_id(),
            nonce: nonce.clone(),
            content,
            filter,
            target_groups: distinct_ordered(target_groups),
            created_at: self.clock.utc_now(),
        };
        let message_id = record.id;
        let groups = record.target_groups.clone();
        let event_filter = record.filter.clone();

        self.messages.insert(record, cancel).await?;
        info!(message_id, groups = groups.len(), "Message accepted");

        let (pushed_groups, skipped_groups) =
            self.fan_out(message_id, &event_filter, &groups).await;

        Ok(SendReport::single(
            SendMessageResponse::success(nonce),
            SendOutcome::Accepted {
                message_id,
                pushed_groups,
                skipped_groups,
            },
        ))
    }

    /// 批量发布，逐条处理并合并结果
    ///
    /// 单条失败只标记该 nonce，已接受的消息不受影响。
    #[instrument(skip(self, messages, cancel), fields(count = messages.len()))]
    pub async fn send_messages(
        &self,
        messages: Vec<SendMessage>,
        cancel: &CancellationToken,
    ) -> BroadcastResult<SendReport> {
        if messages.is_empty() {
            warn!("Rejecting empty message batch");
            return Ok(SendReport {
                response: SendMessageResponse::rejected(SendRejection::Validation.to_string()),
                outcomes: vec![SendOutcome::Rejected(SendRejection::Validation)],
            });
        }

        let mut report = SendReport::default();
        for message in messages {
            let nonce = message.nonce.clone();
            match self.send_message(message, cancel).await {
                Ok(single) => {
                    report.response.merge(single.response);
                    report.outcomes.extend(single.outcomes);
                }
                Err(BroadcastError::UnsupportedContent(reason)) => {
                    warn!(nonce = %nonce, "Skipping message with unsupported content");
                    report
                        .response
                        .merge(SendMessageResponse::failure(nonce, reason));
                    report.outcomes.push(SendOutcome::Unsupported);
                }
                Err(err) => {
                    warn!(nonce = %nonce, error = %err, "Failed to send message in batch");
                    report
                        .response
                        .merge(SendMessageResponse::failure(nonce, err.to_string()));
                    report.outcomes.push(SendOutcome::Failed);
                }
            }
        }
        Ok(report)
    }

    /// 连接建立后向该连接下发客户端 ID
    #[instrument(skip(self))]
    pub async fn send_client_secret(&self, connection_id: &str) -> BroadcastResult<()> {
        if is_blank(connection_id) {
            return Ok(());
        }
        let Some(client) = self.broadcaster.client(connection_id) else {
            debug!("Connection not found, skipping client secret");
            return Ok(());
        };
        client
            .send(ClientEvent::SetClientId {
                client_id: connection_id.to_string(),
            })
            .await?;
        Ok(())
    }

    /// 按客户端密钥把连接加入群组
    #[instrument(skip(self, request), fields(group = %request.group_name))]
    pub async fn join_group(&self, request: JoinGroupRequest) -> BroadcastResult<JoinGroupResponse> {
        let invalid = |nonce: String| JoinGroupResponse {
            joined_group_name: None,
            nonce,
            error_message: Some(INVALID_JOIN_MESSAGE.to_string()),
        };

        if !request.is_valid() {
            warn!("Rejecting invalid join request");
            return Ok(invalid(request.nonce));
        }
        if self.broadcaster.user(&request.secret).is_none() {
            warn!("Rejecting join request for unknown connection");
            return Ok(invalid(request.nonce));
        }

        // 连接可能在查找之后断开
        let added = self
            .broadcaster
            .add_to_group(&request.secret, &request.group_name)
            .await;
        if let Err(err) = added {
            warn!(error = %err, "Failed to add connection to group");
            return Ok(invalid(request.nonce));
        }
        info!("Connection joined group");

        Ok(JoinGroupResponse {
            joined_group_name: Some(request.group_name),
            nonce: request.nonce,
            error_message: None,
        })
    }

    /// 连接断开后从所有群组移除
    #[instrument(skip(self))]
    pub async fn leave_group(&self, connection_id: &str) -> BroadcastResult<()> {
        if is_blank(connection_id) {
            return Ok(());
        }
        self.broadcaster.remove_from_groups(connection_id).await?;
        debug!("Connection left all groups");
        Ok(())
    }

    /// 重连后同步群组消息
    #[instrument(skip(self, request, cancel), fields(user_id = %request.user_id, group = %request.from_group))]
    pub async fn sync_message(
        &self,
        request: GetMessages,
        cancel: &CancellationToken,
    ) -> BroadcastResult<MessagePack> {
        self.replay(request, cancel).await
    }

    /// 加载更多群组消息
    #[instrument(skip(self, request, cancel), fields(user_id = %request.user_id, group = %request.from_group))]
    pub async fn get_more_messages(
        &self,
        request: GetMessages,
        cancel: &CancellationToken,
    ) -> BroadcastResult<MessagePack> {
        self.replay(request, cancel).await
    }

    /// 记录用户阅读进度
    ///
    /// 每个用户只保留一条有效进度（`deletedAt` 为空），已有则覆盖起止 ID，否则新建。
    #[instrument(skip(self, request, cancel), fields(user_id = %request.user_id))]
    pub async fn update_message_tracker(
        &self,
        request: UpdateMessageTracker,
        cancel: &CancellationToken,
    ) -> BroadcastResult<bool> {
        if !request.is_valid() {
            warn!("Rejecting invalid tracker update");
            return Ok(false);
        }

        let active = Filter::eq("userId", request.user_id.as_str())
            .and(Filter::eq("deletedAt", Bson::Null));
        let existing = self.tracks.query(active, cancel).first().await?;

        match existing {
            Some(mut track) => {
                track.from_event_id = request.from_message_id;
                track.thru_event_id = request.thru_message_id;
                let key = track.id.clone();
                self.tracks.update(&key, track, cancel).await?;
                debug!(track_id = %key, "Message track advanced");
            }
            None => {
                let track = MessageTrack {
                    id: Uuid::new_v4().to_string(),
                    user_id: request.user_id,
                    from_event_id: request.from_message_id,
                    thru_event_id: request.thru_message_id,
                    created_at: self.clock.utc_now(),
                    deleted_at: None,
                };
                debug!(track_id = %track.id, "Message track created");
                self.tracks.insert(track, cancel).await?;
            }
        }
        Ok(true)
    }

    /// 清空用户消息（尚未支持）
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn clear_all_messages(&self, request: ClearAllMessages) -> BroadcastResult<bool> {
        if !request.is_valid() {
            return Ok(false);
        }
        Err(BroadcastError::NotImplemented("ClearAllMessages"))
    }

    async fn is_duplicate(&self, nonce: &str, cancel: &CancellationToken) -> BroadcastResult<bool> {
        let window_start = self.clock.utc_now() - self.options.dedup_window;
        let filter = Filter::eq("nonce", nonce).and(Filter::gte(
            "createdAt",
            bson::DateTime::from_chrono(window_start),
        ));
        Ok(self.messages.query(filter, cancel).any().await?)
    }

    /// 并发推送到每个目标群组，返回 (已推送, 已跳过) 数量
    async fn fan_out(&self, message_id: i64, filter: &MessageFilter, groups: &[String]) -> (usize, usize) {
        let pushes = groups.iter().map(|group| async move {
            let Some(proxy) = self.broadcaster.group(group) else {
                debug!(group = %group, "Group has no members, skipping push");
                return false;
            };
            let event = ClientEvent::Update {
                event_id: message_id,
                filter: filter.clone(),
            };
            if let Err(err) = proxy.send(event).await {
                warn!(group = %group, error = %err, "Failed to push update to group");
            } else {
                debug!(group = %group, "Pushed update to group");
            }
            true
        });

        let results = join_all(pushes).await;
        let pushed = results.iter().filter(|pushed| **pushed).count();
        (pushed, results.len() - pushed)
    }

    async fn replay(&self, request: GetMessages, cancel: &CancellationToken) -> BroadcastResult<MessagePack> {
        if !request.is_valid() {
            warn!("Rejecting invalid replay request");
            return Ok(MessagePack::empty(request.from_message_id));
        }

        // 群组的全部消息按 ID 升序作为一页返回
        let messages = self
            .messages
            .query(Filter::contains("targetGroups", request.from_group.as_str()), cancel)
            .get_ordered(&[SortKey::ascending(ID_FIELD)])
            .await?
            .into_iter()
            .map(|info| MessageView {
                id: info.id,
                has_seen: false,
                created_at: info.created_at,
                content: info.content,
            })
            .collect::<Vec<_>>();
        debug!(count = messages.len(), "Replaying group messages");

        Ok(MessagePack {
            last_message_id: request.from_message_id,
            has_more_pages: false,
            messages,
        })
    }
}

fn reject(nonce: &str, rejection: SendRejection) -> SendReport {
    let response = if is_blank(nonce) {
        SendMessageResponse::rejected(rejection.to_string())
    } else {
        SendMessageResponse::failure(nonce, rejection.to_string())
    };
    SendReport::single(response, SendOutcome::Rejected(rejection))
}
