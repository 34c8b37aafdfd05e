//! Wire 风格的依赖注入模块
//!
//! 按依赖顺序构建消息中心的全部组件

use std::sync::Arc;

use anyhow::{Context, Result};
use flare_message_center_core::config::FlareAppConfig;
use flare_message_center_core::metrics::MessageCenterMetrics;
use flare_message_center_core::{DateTimeService, SystemDateTimeService};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::handlers::{MessageCenterCommandHandler, MessageCenterQueryHandler};
use crate::config::MessageCenterConfig;
use crate::domain::service::{BroadcastCenter, BroadcastCenterOptions};
use crate::infrastructure::{LocalGroupBroadcaster, TickMessageIdGenerator, build_repositories};

/// 应用上下文 - 包含所有已初始化的服务
pub struct ApplicationContext {
    pub config: Arc<MessageCenterConfig>,
    pub broadcaster: Arc<LocalGroupBroadcaster>,
    pub command_handler: Arc<MessageCenterCommandHandler>,
    pub query_handler: Arc<MessageCenterQueryHandler>,
    pub shutdown: CancellationToken,
}

/// 构建应用上下文
///
/// # 参数
/// * `app_config` - 应用配置
/// * `shutdown` - 关闭信号，取消时中止所有进行中的存储操作
pub async fn initialize(
    app_config: &FlareAppConfig,
    shutdown: CancellationToken,
) -> Result<ApplicationContext> {
    // 1. 加载消息中心配置
    let config = Arc::new(
        MessageCenterConfig::from_app_config(app_config)
            .context("Failed to load message center configuration")?,
    );

    // 2. 构建仓储
    let repositories = build_repositories(&config)
        .await
        .context("Failed to build message center repositories")?;

    // 3. 时钟与 ID 生成器
    let clock: Arc<dyn DateTimeService> = Arc::new(SystemDateTimeService);
    let id_generator = Arc::new(TickMessageIdGenerator::new(clock.clone()));

    // 4. 群组推送
    let broadcaster = Arc::new(LocalGroupBroadcaster::new());

    // 5. 领域服务
    let options = BroadcastCenterOptions {
        dedup_window: config.dedup_window(),
    };
    let center = Arc::new(BroadcastCenter::new(
        repositories.messages,
        repositories.tracks,
        broadcaster.clone(),
        clock,
        id_generator,
        options,
    ));

    // 6. 指标与处理器
    let metrics = MessageCenterMetrics::shared();
    let command_handler = Arc::new(MessageCenterCommandHandler::new(
        center.clone(),
        metrics.clone(),
        shutdown.clone(),
    ));
    let query_handler = Arc::new(MessageCenterQueryHandler::new(
        center,
        metrics,
        shutdown.clone(),
    ));

    info!(
        service = %config.service_name,
        store = ?config.store,
        dedup_window_seconds = config.dedup_window_seconds,
        "Message center initialized"
    );

    Ok(ApplicationContext {
        config,
        broadcaster,
        command_handler,
        query_handler,
        shutdown,
    })
}
