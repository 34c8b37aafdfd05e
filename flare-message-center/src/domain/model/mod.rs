//! 领域模型
//!
//! - 持久化实体：`MessageInfo`（已接收的广播消息）、`MessageTrack`（用户阅读进度）
//! - 值对象：`MessageContent`、`MessageFilter`
//! - 推送给客户端的事件：`ClientEvent`

mod requests;

pub use requests::{
    ClearAllMessages, GetMessages, JoinGroupRequest, JoinGroupResponse, MessagePack, MessageView,
    SendMessage, SendMessageResponse, UpdateMessageTracker,
};

use chrono::{DateTime, Utc};
use flare_message_center_core::data::DbModel;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

/// 消息内容（按 `type` 字段区分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageContent {
    /// 通知：文本 + 跳转地址
    Notification {
        #[serde(default)]
        message: String,
        #[serde(default, rename = "endpointUrl")]
        endpoint_url: String,
    },
    /// 动态负载：任意 JSON + 内容类型
    Dynamic {
        #[serde(default)]
        data: serde_json::Value,
        #[serde(default, rename = "contentType")]
        content_type: Option<String>,
    },
    /// 无法识别的内容类型
    #[serde(other)]
    Unsupported,
}

impl MessageContent {
    pub fn notification(message: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        MessageContent::Notification {
            message: message.into(),
            endpoint_url: endpoint_url.into(),
        }
    }

    pub fn dynamic(data: serde_json::Value, content_type: Option<String>) -> Self {
        MessageContent::Dynamic { data, content_type }
    }

    /// 内容类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            MessageContent::Notification { .. } => "Notification",
            MessageContent::Dynamic { .. } => "Dynamic",
            MessageContent::Unsupported => "Unsupported",
        }
    }
}

/// 消息过滤条件（作用域 + 活动）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFilter {
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

impl MessageFilter {
    pub fn new<S: Into<String>>(
        scopes: impl IntoIterator<Item = S>,
        activities: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            scopes: scopes.into_iter().map(Into::into).collect(),
            activities: activities.into_iter().map(Into::into).collect(),
        }
    }
}

/// 已接收的广播消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    /// 由接收时刻推导的单调递增 ID
    #[serde(rename = "_id")]
    pub id: i64,
    pub nonce: String,
    pub content: MessageContent,
    pub filter: MessageFilter,
    pub target_groups: Vec<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl DbModel for MessageInfo {
    type Key = i64;

    fn id(&self) -> i64 {
        self.id
    }
}

/// 用户阅读进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTrack {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub from_event_id: i64,
    pub thru_event_id: i64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "optional_bson_datetime")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DbModel for MessageTrack {
    type Key = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// 推送给客户端的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "target", content = "arguments")]
pub enum ClientEvent {
    /// 连接建立后下发客户端 ID
    #[serde(rename = "setClientId")]
    SetClientId { client_id: String },
    /// 群组有新消息
    #[serde(rename = "update")]
    Update { event_id: i64, filter: MessageFilter },
}

impl ClientEvent {
    /// 客户端方法名
    pub fn method(&self) -> &'static str {
        match self {
            ClientEvent::SetClientId { .. } => "setClientId",
            ClientEvent::Update { .. } => "update",
        }
    }
}

/// `Option<DateTime<Utc>>` 以 BSON 日期存储，`None` 存为 null
mod optional_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(bson::DateTime::to_chrono))
    }
}
