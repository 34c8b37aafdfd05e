//! # 消息中心应用层
//!
//! 编排领域服务并记录指标

pub mod handlers;

pub use handlers::{MessageCenterCommandHandler, MessageCenterQueryHandler};
