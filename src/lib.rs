//! Flare Message Center Core 公共库
//!
//! 提供统一的配置加载、日志、指标、时钟服务以及通用仓储（内存 / MongoDB）与分页能力

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod tracing;
pub mod utils;

pub use config::{
    ConfigManager, FlareAppConfig, LoggingConfig, MessageCenterServiceConfig, MongoInstanceConfig,
    ServiceConfig, ServicesConfig, app_config, load_config,
};
pub use error::*;
pub use utils::*;
