//! # 消息中心服务层
//!
//! 提供应用启动和依赖注入

mod wire;

pub use wire::{ApplicationContext, initialize};

use anyhow::Result;
use flare_message_center_core::ServiceHelper;
use flare_message_center_core::metrics::gather_metrics;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 应用启动器
pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 运行应用的主入口点
    pub async fn run(config_path: Option<&str>) -> Result<()> {
        let app_config = ServiceHelper::bootstrap(config_path, false)?;

        let shutdown = CancellationToken::new();
        let context = initialize(app_config, shutdown).await?;

        info!("ApplicationBootstrap created successfully");

        Self::run_with_context(context).await
    }

    /// 运行服务直到收到关闭信号
    pub async fn run_with_context(context: ApplicationContext) -> Result<()> {
        info!(
            service = %context.config.service_name,
            "✅ Message center is running"
        );

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("shutdown signal received (Ctrl+C)");
            }
            _ = context.shutdown.cancelled() => {
                info!("shutdown requested");
            }
        }

        context.shutdown.cancel();
        info!(
            connections = context.broadcaster.connection_count(),
            "Message center stopped"
        );
        tracing::debug!(metrics = %gather_metrics(), "Final metrics snapshot");
        Ok(())
    }
}
