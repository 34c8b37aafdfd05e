//! 配置管理器 - 负责处理不同环境下的配置选择和覆盖
//!
//! 该模块提供了配置管理功能，包括：
//! - 根据环境变量选择 MongoDB 配置
//! - 加载环境特定配置
//! - 合并配置值

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use toml::Value;

use super::{FlareAppConfig, MongoInstanceConfig, load_toml_value};

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 根据环境变量或配置选择 MongoDB 配置
    ///
    /// 优先级：
    /// 1. 环境变量 FLARE_MONGODB_PROFILE 指定的配置
    /// 2. 配置文件中指定的配置
    pub fn select_mongodb_profile(
        config: &FlareAppConfig,
        profile_name: &str,
    ) -> Option<MongoInstanceConfig> {
        if let Ok(env_profile) = env::var("FLARE_MONGODB_PROFILE") {
            if let Some(profile) = config.mongodb_profile(&env_profile) {
                return Some(profile.clone());
            }
        }

        config.mongodb_profile(profile_name).cloned()
    }

    /// 获取当前环境名称
    ///
    /// 从环境变量 FLARE_ENV 获取当前环境名称，
    /// 如果未设置则默认为 "development"
    pub fn get_environment() -> String {
        env::var("FLARE_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 根据环境加载特定配置
    ///
    /// 加载 config/environments/{environment}.toml 文件中的配置，
    /// 并将其合并到基础配置中
    pub fn load_environment_config(base_config: &mut FlareAppConfig) -> Result<()> {
        let env = Self::get_environment();
        let env_config_path = format!("config/environments/{}.toml", env);
        Self::apply_environment_file(base_config, Path::new(&env_config_path))
    }

    /// 合并指定的环境配置文件；文件不存在时不做任何修改
    pub fn apply_environment_file(base_config: &mut FlareAppConfig, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let env_config = load_toml_value(path)
            .with_context(|| format!("无法读取环境配置文件: {}", path.display()))?;
        Self::merge_config_values(base_config, &env_config);
        Ok(())
    }

    /// 合并配置值
    ///
    /// 环境配置只允许覆盖日志级别和 MongoDB 连接信息
    fn merge_config_values(base_config: &mut FlareAppConfig, env_config: &Value) {
        if let Some(level) = env_config
            .get("logging")
            .and_then(|logging| logging.get("level"))
            .and_then(|v| v.as_str())
        {
            base_config.logging.level = level.to_string();
        }

        let Some(tables) = env_config.get("mongodb").and_then(|v| v.as_table()) else {
            return;
        };

        for (key, value) in tables {
            // 只有当配置包含 url 时才处理
            let Some(url) = value.get("url").and_then(|v| v.as_str()) else {
                continue;
            };
            let database = value
                .get("database")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| {
                    base_config
                        .mongodb
                        .get(key)
                        .and_then(|existing| existing.database.clone())
                });

            base_config.mongodb.insert(
                key.clone(),
                MongoInstanceConfig {
                    url: url.to_string(),
                    database,
                },
            );
        }
    }
}
