use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageContent, MessageFilter};

/// 发布请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub filter: Option<MessageFilter>,
    #[serde(default)]
    pub target_groups: Vec<String>,
    pub content: MessageContent,
}

impl SendMessage {
    pub fn new<S: Into<String>>(
        nonce: impl Into<String>,
        filter: MessageFilter,
        target_groups: impl IntoIterator<Item = S>,
        content: MessageContent,
    ) -> Self {
        Self {
            nonce: nonce.into(),
            filter: Some(filter),
            target_groups: target_groups.into_iter().map(Into::into).collect(),
            content,
        }
    }
}

/// 发布结果：每个 nonce 的成功标记 + 汇总错误信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub nonce_status: HashMap<String, bool>,
    pub error_message: Option<String>,
}

impl SendMessageResponse {
    pub fn success(nonce: impl Into<String>) -> Self {
        Self {
            nonce_status: HashMap::from([(nonce.into(), true)]),
            error_message: None,
        }
    }

    pub fn failure(nonce: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            nonce_status: HashMap::from([(nonce.into(), false)]),
            error_message: Some(error_message.into()),
        }
    }

    /// 不关联任何 nonce 的失败（例如空批次）
    pub fn rejected(error_message: impl Into<String>) -> Self {
        Self {
            nonce_status: HashMap::new(),
            error_message: Some(error_message.into()),
        }
    }

    /// 合并另一条结果：同一 nonce 任一成功即视为成功，非空错误信息以后者为准
    pub fn merge(&mut self, other: SendMessageResponse) {
        for (nonce, status) in other.nonce_status {
            self.nonce_status
                .entry(nonce)
                .and_modify(|current| *current |= status)
                .or_insert(status);
        }
        if let Some(message) = other.error_message.filter(|m| !m.is_empty()) {
            self.error_message = Some(message);
        }
    }

    pub fn is_success(&self, nonce: &str) -> bool {
        self.nonce_status.get(nonce).copied().unwrap_or(false)
    }
}

/// 加入群组请求
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupRequest {
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub nonce: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupResponse {
    pub joined_group_name: Option<String>,
    pub nonce: String,
    pub error_message: Option<String>,
}

/// 回放请求（sync / get-more 共用）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMessages {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub from_group: String,
    #[serde(default)]
    pub from_message_id: i64,
    #[serde(default)]
    pub filter: Option<MessageFilter>,
}

/// 返回给客户端的消息视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: i64,
    pub has_seen: bool,
    pub created_at: DateTime<Utc>,
    pub content: MessageContent,
}

/// 回放结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePack {
    pub last_message_id: i64,
    pub has_more_pages: bool,
    pub messages: Vec<MessageView>,
}

impl MessagePack {
    pub fn empty(last_message_id: i64) -> Self {
        Self {
            last_message_id,
            has_more_pages: false,
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageTracker {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub from_message_id: i64,
    #[serde(default)]
    pub thru_message_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearAllMessages {
    #[serde(default)]
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_unions_nonce_status() {
        let mut response = SendMessageResponse::success("n1");
        response.merge(SendMessageResponse::failure("n2", "Duplicated message."));
        response.merge(SendMessageResponse::failure("n1", "Duplicated message."));

        assert!(response.is_success("n1"));
        assert!(!response.is_success("n2"));
        assert_eq!(response.error_message.as_deref(), Some("Duplicated message."));
    }

    #[test]
    fn test_merge_keeps_last_error() {
        let mut response = SendMessageResponse::failure("a", "first");
        response.merge(SendMessageResponse::failure("b", "second"));
        response.merge(SendMessageResponse::success("c"));
        assert_eq!(response.error_message.as_deref(), Some("second"));
        assert_eq!(response.nonce_status.len(), 3);
    }
}
