//! Flare Message Center 配置模块
//!
//! 该模块提供了完整的应用程序配置管理功能，包括：
//! - 配置文件加载和解析（单文件或目录片段合并）
//! - 环境特定配置覆盖
//! - 日志、MongoDB 与消息中心服务配置定义

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<FlareAppConfig> = OnceLock::new();

/// 服务基础信息
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// 服务名称
    #[serde(default = "default_service_name")]
    pub name: String,
    /// 服务版本
    #[serde(default = "default_service_version")]
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            version: default_service_version(),
        }
    }
}

fn default_service_name() -> String {
    "flare-message-center".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否输出 target
    #[serde(default = "default_true")]
    pub with_target: bool,
    /// 是否输出线程 ID
    #[serde(default)]
    pub with_thread_ids: bool,
    /// 是否输出文件名
    #[serde(default)]
    pub with_file: bool,
    /// 是否输出行号
    #[serde(default)]
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_true() -> bool {
    true
}

/// MongoDB 实例配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MongoInstanceConfig {
    /// MongoDB 连接 URL
    pub url: String,
    /// 数据库名称
    #[serde(default)]
    pub database: Option<String>,
}

/// 消息中心服务配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MessageCenterServiceConfig {
    /// 服务名称
    #[serde(default)]
    pub service_name: Option<String>,
    /// 存储后端（memory / mongodb）
    #[serde(default)]
    pub store: Option<String>,
    /// MongoDB 配置引用
    #[serde(default)]
    pub mongodb: Option<String>,
    /// 数据库名称（覆盖 MongoDB 配置中的 database）
    #[serde(default)]
    pub database: Option<String>,
    /// 消息集合名称
    #[serde(default)]
    pub message_collection: Option<String>,
    /// 阅读进度集合名称
    #[serde(default)]
    pub track_collection: Option<String>,
    /// 是否关闭类型鉴别字段
    #[serde(default)]
    pub no_discriminator: Option<bool>,
    /// 去重窗口（秒）
    #[serde(default)]
    pub dedup_window_seconds: Option<u64>,
    /// 批量插入批次大小
    #[serde(default)]
    pub bulk_batch_size: Option<usize>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 消息中心服务配置
    #[serde(default)]
    pub message_center: Option<MessageCenterServiceConfig>,
}

/// Flare 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FlareAppConfig {
    /// 服务基础信息
    #[serde(default)]
    pub service: ServiceConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// MongoDB 配置映射
    #[serde(default)]
    pub mongodb: HashMap<String, MongoInstanceConfig>,
    /// 服务配置
    #[serde(default)]
    pub services: ServicesConfig,
}

impl FlareAppConfig {
    /// 获取 MongoDB 配置
    pub fn mongodb_profile(&self, name: &str) -> Option<&MongoInstanceConfig> {
        self.mongodb.get(name)
    }

    /// 获取消息中心服务配置
    pub fn message_center_service(&self) -> MessageCenterServiceConfig {
        self.services.message_center.clone().unwrap_or_default()
    }

    /// 校验服务配置中引用的基础设施配置是否存在
    pub fn validate_references(&self) -> Result<()> {
        let service = self.message_center_service();
        if let Some(profile) = service.mongodb.as_deref() {
            if self.mongodb_profile(profile).is_none() {
                return Err(anyhow!(
                    "services.message_center references unknown mongodb profile '{}'",
                    profile
                ));
            }
        }
        if let Some(store) = service.store.as_deref() {
            if !matches!(store, "memory" | "mongodb") {
                return Err(anyhow!(
                    "services.message_center.store must be 'memory' or 'mongodb', got '{}'",
                    store
                ));
            }
        }
        Ok(())
    }

    /// 确保配置有默认值
    fn ensure_defaults(&mut self) {
        if self.service.name.is_empty() {
            self.service.name = default_service_name();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
    }
}

/// 加载配置
pub fn load_config(path: Option<&str>) -> &'static FlareAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| {
        let mut cfg = load_with_fallback(&candidates);
        // 加载环境特定配置
        if let Err(e) = manager::ConfigManager::load_environment_config(&mut cfg) {
            warn!("failed to load environment config: {}", e);
        }
        cfg
    })
}

/// 获取应用配置
pub fn app_config() -> Result<&'static FlareAppConfig> {
    APP_CONFIG
        .get()
        .ok_or_else(|| anyhow!("configuration not initialised"))
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> FlareAppConfig {
    for path in candidates {
        match load_config_from_source(path) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    FlareAppConfig::default()
}

/// 从文件或目录加载配置（不写入全局实例）
pub fn load_config_from_source(path: &Path) -> Result<FlareAppConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    let mut cfg = if metadata.is_dir() {
        load_config_from_directory(path)?
    } else {
        load_config_from_file(path)?
    };
    cfg.ensure_defaults();
    Ok(cfg)
}

/// 从文件加载配置
fn load_config_from_file(path: &Path) -> Result<FlareAppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file: {}", path.display()))?;
    let cfg: FlareAppConfig = toml::from_str(&content)
        .with_context(|| format!("invalid config format: {}", path.display()))?;
    Ok(cfg)
}

/// 从目录加载配置
///
/// 以 `base.toml` 为基础，依次合并 `shared/`、`services/`、`overrides/` 中的片段。
fn load_config_from_directory(path: &Path) -> Result<FlareAppConfig> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;

    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("services"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    let cfg: FlareAppConfig = merged
        .try_into()
        .with_context(|| format!("invalid configuration after merging {}", path.display()))?;

    Ok(cfg)
}

/// 合并目录中的配置
fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let value = load_toml_value(&entry.path())?;
        merge_value(root, value);
    }

    Ok(())
}

/// 加载 TOML 值
pub(crate) fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))?;
    Ok(value)
}

/// 合并值：表逐键递归合并，其他类型直接覆盖
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                for (key, overlay_value) in overlay_table.into_iter() {
                    match base_table.get_mut(&key) {
                        Some(base_value) => merge_value(base_value, overlay_value),
                        None => {
                            base_table.insert(key, overlay_value);
                        }
                    }
                }
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}
