//! 请求校验规则

use flare_message_center_core::{all_non_blank, is_blank};

use crate::domain::model::{
    ClearAllMessages, GetMessages, JoinGroupRequest, MessageContent, MessageFilter, SendMessage,
    UpdateMessageTracker,
};

/// 请求自身字段是否完整有效
pub trait Validate {
    fn is_valid(&self) -> bool;
}

impl Validate for MessageFilter {
    fn is_valid(&self) -> bool {
        all_non_blank(&self.scopes) && all_non_blank(&self.activities)
    }
}

impl Validate for MessageContent {
    /// 无法识别的内容类型不在这里拒绝，由发送流程单独报错
    fn is_valid(&self) -> bool {
        match self {
            MessageContent::Notification {
                message,
                endpoint_url,
            } => !is_blank(message) && !is_blank(endpoint_url),
            MessageContent::Dynamic { data, .. } => !data.is_null(),
            MessageContent::Unsupported => true,
        }
    }
}

impl Validate for SendMessage {
    fn is_valid(&self) -> bool {
        !is_blank(&self.nonce)
            && self.filter.as_ref().is_some_and(Validate::is_valid)
            && all_non_blank(&self.target_groups)
            && self.content.is_valid()
    }
}

impl Validate for JoinGroupRequest {
    fn is_valid(&self) -> bool {
        !is_blank(&self.secret) && !is_blank(&self.group_name)
    }
}

impl Validate for GetMessages {
    fn is_valid(&self) -> bool {
        !is_blank(&self.user_id)
            && !is_blank(&self.from_group)
            && self.from_message_id >= 0
            && self.filter.as_ref().is_some_and(Validate::is_valid)
    }
}

impl Validate for UpdateMessageTracker {
    fn is_valid(&self) -> bool {
        !is_blank(&self.user_id) && self.from_message_id >= 0 && self.thru_message_id >= 0
    }
}

impl Validate for ClearAllMessages {
    fn is_valid(&self) -> bool {
        !is_blank(&self.user_id)
    }
}
