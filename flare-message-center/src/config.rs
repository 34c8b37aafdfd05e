use std::env;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use flare_message_center_core::config::{ConfigManager, FlareAppConfig};
use flare_message_center_core::data::DEFAULT_BATCH_SIZE;

use crate::domain::service::DEFAULT_DEDUP_WINDOW_MINUTES;

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    MongoDb,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "mongodb" | "mongo" => Ok(StoreBackend::MongoDb),
            other => Err(anyhow!("unknown message center store '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MessageCenterConfig {
    pub service_name: String,
    pub store: StoreBackend,
    pub mongo_url: Option<String>,
    pub mongo_database: String,
    pub message_collection: String,
    pub track_collection: String,
    pub no_discriminator: bool,
    pub dedup_window_seconds: u64,
    pub bulk_batch_size: usize,
}

impl MessageCenterConfig {
    /// 从应用配置加载：环境变量 → 服务配置 → 默认值
    pub fn from_app_config(app: &FlareAppConfig) -> Result<Self> {
        let service_config = app.message_center_service();
        // FLARE_MONGODB_PROFILE 可切换使用的 MongoDB 配置
        let mongo_profile = service_config
            .mongodb
            .as_deref()
            .and_then(|name| ConfigManager::select_mongodb_profile(app, name));

        let service_name = service_config
            .service_name
            .clone()
            .unwrap_or_else(|| app.service.name.clone());

        let mongo_url = env::var("MESSAGE_CENTER_MONGO_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| mongo_profile.as_ref().map(|profile| profile.url.clone()));

        let store = match env::var("MESSAGE_CENTER_STORE")
            .ok()
            .or_else(|| service_config.store.clone())
        {
            Some(value) => value.parse()?,
            None if mongo_url.is_some() => StoreBackend::MongoDb,
            None => StoreBackend::Memory,
        };

        if store == StoreBackend::MongoDb && mongo_url.is_none() {
            return Err(anyhow!(
                "message center store is mongodb but no MongoDB url is configured"
            ));
        }

        let mongo_database = env::var("MESSAGE_CENTER_MONGO_DATABASE")
            .ok()
            .or_else(|| service_config.database.clone())
            .or_else(|| mongo_profile.as_ref().and_then(|profile| profile.database.clone()))
            .unwrap_or_else(|| "message_center".to_string());

        let message_collection = service_config
            .message_collection
            .clone()
            .unwrap_or_else(|| "messages".to_string());

        let track_collection = service_config
            .track_collection
            .clone()
            .unwrap_or_else(|| "message_tracks".to_string());

        let dedup_window_seconds = env::var("MESSAGE_CENTER_DEDUP_WINDOW_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .or(service_config.dedup_window_seconds)
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_DEDUP_WINDOW_MINUTES as u64 * 60);

        let bulk_batch_size = env::var("MESSAGE_CENTER_BULK_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .or(service_config.bulk_batch_size)
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_BATCH_SIZE);

        Ok(Self {
            service_name,
            store,
            mongo_url,
            mongo_database,
            message_collection,
            track_collection,
            no_discriminator: service_config.no_discriminator.unwrap_or(false),
            dedup_window_seconds,
            bulk_batch_size,
        })
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.dedup_window_seconds).unwrap_or(i64::MAX / 1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flare_message_center_core::config::{MessageCenterServiceConfig, MongoInstanceConfig};

    fn app_with(service: MessageCenterServiceConfig) -> FlareAppConfig {
        let mut app = FlareAppConfig::default();
        app.mongodb.insert(
            "primary".to_string(),
            MongoInstanceConfig {
                url: "mongodb://localhost:27017".to_string(),
                database: Some("flare".to_string()),
            },
        );
        app.services.message_center = Some(service);
        app
    }

    #[test]
    fn test_defaults_use_memory_store() {
        let config = MessageCenterConfig::from_app_config(&app_with(Default::default())).unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.dedup_window_seconds, 300);
        assert_eq!(config.bulk_batch_size, 100);
        assert_eq!(config.message_collection, "messages");
        assert_eq!(config.dedup_window(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_mongo_profile_is_resolved() {
        let config = MessageCenterConfig::from_app_config(&app_with(MessageCenterServiceConfig {
            store: Some("mongodb".to_string()),
            mongodb: Some("primary".to_string()),
            dedup_window_seconds: Some(60),
            ..Default::default()
        }))
        .unwrap();

        assert_eq!(config.store, StoreBackend::MongoDb);
        assert_eq!(config.mongo_url.as_deref(), Some("mongodb://localhost:27017"));
        assert_eq!(config.mongo_database, "flare");
        assert_eq!(config.dedup_window_seconds, 60);
    }

    #[test]
    fn test_mongo_store_without_url_fails() {
        let result = MessageCenterConfig::from_app_config(&app_with(MessageCenterServiceConfig {
            store: Some("mongodb".to_string()),
            ..Default::default()
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("Mongo".parse::<StoreBackend>().unwrap(), StoreBackend::MongoDb);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
