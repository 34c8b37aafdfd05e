//! # 日志初始化模块
//!
//! 为各个服务模块提供统一的 tracing 日志初始化能力。

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// 构建日志过滤器：优先使用环境变量 RUST_LOG，否则使用配置的日志级别
pub fn build_env_filter(logging_config: Option<&LoggingConfig>) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level_str = logging_config.map(|c| c.level.as_str()).unwrap_or("debug");
            EnvFilter::try_new(level_str).unwrap_or_else(|_| EnvFilter::new("debug"))
        }
    }
}

/// 从配置初始化日志系统
///
/// # 参数
/// * `logging_config` - 日志配置（可选），如果为 None 则使用默认配置（debug 级别）
///
/// 重复初始化时静默忽略（测试中多个用例可能各自调用）。
///
/// # 示例
/// ```rust,ignore
/// use flare_message_center_core::config::LoggingConfig;
///
/// init_tracing_from_config(None);
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     with_target: false,
///     with_thread_ids: true,
///     with_file: true,
///     with_line_number: true,
/// };
/// init_tracing_from_config(Some(&config));
/// ```
pub fn init_tracing_from_config(logging_config: Option<&LoggingConfig>) {
    let env_filter = build_env_filter(logging_config);

    let default_config = LoggingConfig::default();
    let config = logging_config.unwrap_or(&default_config);

    let _ = fmt::Subscriber::builder()
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids)
        .with_file(config.with_file)
        .with_line_number(config.with_line_number)
        .with_env_filter(env_filter)
        .try_init();
}
