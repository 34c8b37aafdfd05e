//! 领域层
//!
//! - `model`：消息、阅读进度与请求/响应模型
//! - `repository`：推送与 ID 生成端口
//! - `service`：广播中心
//! - `validation`：请求校验

pub mod error;
pub mod model;
pub mod repository;
pub mod service;
pub mod validation;
