//! # Flare Message Center
//!
//! 消息中心服务：向订阅群组广播通知，并支持客户端重连后回放错过的消息。
//!
//! ## 架构设计
//!
//! - **domain层**：消息模型、推送端口、广播中心
//! - **application层**：命令 / 查询处理器与指标记录
//! - **infrastructure层**：进程内群组推送、ID 生成、仓储构建
//! - **service层**：应用启动和依赖注入

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use domain::service::BroadcastCenter;
pub use service::ApplicationBootstrap;
