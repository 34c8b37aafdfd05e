//! 消息与阅读进度仓储的构建
//!
//! 内存后端用于本地运行和测试；MongoDB 后端按实体类型注册集合并创建查询索引。

use std::sync::Arc;

use anyhow::{Context, Result};
use flare_message_center_core::data::{
    BulkInsertOptions, InMemoryRepository, MongoConnectionStore, Repository,
};
use mongodb::bson::{Document, doc};
use mongodb::options::{CreateIndexOptions, IndexOptions};
use mongodb::{Collection, IndexModel};
use tracing::info;

use crate::config::{MessageCenterConfig, StoreBackend};
use crate::domain::model::{MessageInfo, MessageTrack};

/// 消息中心使用的全部仓储
#[derive(Clone)]
pub struct MessageCenterRepositories {
    pub messages: Arc<dyn Repository<MessageInfo>>,
    pub tracks: Arc<dyn Repository<MessageTrack>>,
}

impl MessageCenterRepositories {
    pub fn in_memory(bulk_options: BulkInsertOptions) -> Self {
        Self {
            messages: Arc::new(
                InMemoryRepository::<MessageInfo>::new().with_bulk_options(bulk_options.clone()),
            ),
            tracks: Arc::new(InMemoryRepository::<MessageTrack>::new().with_bulk_options(bulk_options)),
        }
    }
}

/// 按配置构建仓储
pub async fn build_repositories(config: &MessageCenterConfig) -> Result<MessageCenterRepositories> {
    let bulk_options = BulkInsertOptions::default().with_batch_size(config.bulk_batch_size);

    match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory message store");
            Ok(MessageCenterRepositories::in_memory(bulk_options))
        }
        StoreBackend::MongoDb => {
            let url = config
                .mongo_url
                .clone()
                .context("MongoDB url is required for the mongodb store")?;
            info!(
                database = %config.mongo_database,
                messages = %config.message_collection,
                tracks = %config.track_collection,
                "Using MongoDB message store"
            );

            let store = MongoConnectionStore::builder()
                .setup_database(config.mongo_database.clone(), url)
                .register_collection::<MessageInfo>(
                    Some(&config.message_collection),
                    config.no_discriminator,
                )?
                .register_collection::<MessageTrack>(
                    Some(&config.track_collection),
                    config.no_discriminator,
                )?
                .bulk_options(bulk_options)
                .build()
                .await
                .context("Failed to build MongoDB connection store")?;

            ensure_message_indexes(&store.collection::<MessageInfo>()?).await?;
            ensure_track_indexes(&store.collection::<MessageTrack>()?).await?;

            Ok(MessageCenterRepositories {
                messages: Arc::new(store.repository::<MessageInfo>()?),
                tracks: Arc::new(store.repository::<MessageTrack>()?),
            })
        }
    }
}

async fn ensure_message_indexes(collection: &Collection<Document>) -> Result<()> {
    let nonce_index = IndexModel::builder()
        .keys(doc! {"nonce": 1, "createdAt": -1})
        .options(
            IndexOptions::builder()
                .name(Some("idx_nonce_created".to_string()))
                .build(),
        )
        .build();
    collection
        .create_index(nonce_index, None::<CreateIndexOptions>)
        .await
        .context("Failed to create message nonce index")?;

    let group_index = IndexModel::builder()
        .keys(doc! {"targetGroups": 1, "_id": 1})
        .options(
            IndexOptions::builder()
                .name(Some("idx_target_groups".to_string()))
                .build(),
        )
        .build();
    collection
        .create_index(group_index, None::<CreateIndexOptions>)
        .await
        .context("Failed to create message group index")?;

    Ok(())
}

async fn ensure_track_indexes(collection: &Collection<Document>) -> Result<()> {
    let user_index = IndexModel::builder()
        .keys(doc! {"userId": 1, "deletedAt": 1})
        .options(
            IndexOptions::builder()
                .name(Some("idx_user_active".to_string()))
                .build(),
        )
        .build();
    collection
        .create_index(user_index, None::<CreateIndexOptions>)
        .await
        .context("Failed to create message track index")?;
    Ok(())
}
