//! 辅助工具函数模块
//!
//! 提供配置加载、日志初始化等服务启动常用辅助函数

use anyhow::{Context, Result};

use crate::config::FlareAppConfig;

/// 服务启动辅助函数
pub struct ServiceHelper;

impl ServiceHelper {
    /// 加载配置并验证
    ///
    /// # 参数
    /// * `config_path` - 配置路径
    /// * `strict` - 是否严格验证配置引用
    pub fn load_config(config_path: Option<&str>, strict: bool) -> Result<&'static FlareAppConfig> {
        let config = crate::config::load_config(config_path);

        if strict {
            config
                .validate_references()
                .with_context(|| "configuration validation failed")?;
            return Ok(config);
        }

        // 非严格模式下，即使验证失败也继续运行，只记录警告日志
        if let Err(e) = config.validate_references() {
            tracing::warn!("configuration reference validation failed: {}", e);
        }

        Ok(config)
    }

    /// 加载配置并按配置初始化日志
    pub fn bootstrap(config_path: Option<&str>, strict: bool) -> Result<&'static FlareAppConfig> {
        let config = Self::load_config(config_path, strict)?;
        crate::tracing::init_tracing_from_config(Some(&config.logging));
        Ok(config)
    }
}
