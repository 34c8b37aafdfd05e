//! MongoDB 连接仓库
//!
//! 启动时通过 `MongoConnectionStoreBuilder` 按实体类型注册集合：
//! 每个类型对应一个数据库 + 集合，并声明是否使用类型鉴别字段（`_t`）。
//! 相同连接字符串共享一个驱动客户端。

use std::any::{TypeId, type_name};
use std::collections::HashMap;

use mongodb::bson::Document;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::info;

use crate::data::bulk::BulkInsertOptions;
use crate::data::mongo::repository::MongoRepository;
use crate::data::repository::DbModel;
use crate::error::{DataError, DataResult};

/// 类型鉴别字段名
pub const DISCRIMINATOR_FIELD: &str = "_t";

/// 单个实体类型的集合注册信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConnection {
    /// 实体类型短名，同时作为鉴别值
    pub type_name: String,
    pub collection_name: String,
    pub database_name: String,
    pub connection_string: String,
    /// 为 true 时不写入也不过滤 `_t`
    pub no_discriminator: bool,
}

impl MongoConnection {
    /// 鉴别值；关闭鉴别时为 None
    pub fn discriminator(&self) -> Option<&str> {
        if self.no_discriminator {
            None
        } else {
            Some(self.type_name.as_str())
        }
    }
}

/// 实体类型短名（去掉模块路径和泛型参数）
pub fn short_type_name<T>() -> String {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// 连接仓库构建器
#[derive(Debug, Default)]
pub struct MongoConnectionStoreBuilder {
    current_database: Option<(String, String)>,
    connections: HashMap<TypeId, MongoConnection>,
    bulk_options: BulkInsertOptions,
    bypass_document_validation: bool,
}

impl MongoConnectionStoreBuilder {
    pub fn new() -> Self {
        Self {
            bypass_document_validation: true,
            ..Self::default()
        }
    }

    /// 设置后续注册所使用的数据库与连接字符串
    pub fn setup_database(
        mut self,
        database_name: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        self.current_database = Some((database_name.into(), connection_string.into()));
        self
    }

    /// 注册实体类型对应的集合
    ///
    /// `collection_name` 为 None 时使用类型短名。
    pub fn register_collection<T: DbModel>(
        mut self,
        collection_name: Option<&str>,
        no_discriminator: bool,
    ) -> DataResult<Self> {
        let (database_name, connection_string) = self.current_database.clone().ok_or_else(|| {
            DataError::InvalidConfiguration(format!(
                "setup_database must be called before registering {}",
                short_type_name::<T>()
            ))
        })?;

        let type_name = short_type_name::<T>();
        let collection_name = collection_name
            .map(str::to_string)
            .unwrap_or_else(|| type_name.clone());

        self.connections.insert(
            TypeId::of::<T>(),
            MongoConnection {
                type_name,
                collection_name,
                database_name,
                connection_string,
                no_discriminator,
            },
        );
        Ok(self)
    }

    pub fn bulk_options(mut self, options: BulkInsertOptions) -> Self {
        self.bulk_options = options;
        self
    }

    pub fn bypass_document_validation(mut self, bypass: bool) -> Self {
        self.bypass_document_validation = bypass;
        self
    }

    /// 为每个不同的连接字符串创建客户端
    pub async fn build(self) -> DataResult<MongoConnectionStore> {
        let mut clients: HashMap<String, Client> = HashMap::new();
        for connection in self.connections.values() {
            if clients.contains_key(&connection.connection_string) {
                continue;
            }
            let options = ClientOptions::parse(&connection.connection_string).await?;
            let client = Client::with_options(options)?;
            clients.insert(connection.connection_string.clone(), client);
        }

        info!(
            collections = self.connections.len(),
            clients = clients.len(),
            "MongoDB connection store built"
        );

        Ok(MongoConnectionStore {
            clients,
            connections: self.connections,
            bulk_options: self.bulk_options,
            bypass_document_validation: self.bypass_document_validation,
        })
    }
}

/// 连接仓库
pub struct MongoConnectionStore {
    clients: HashMap<String, Client>,
    connections: HashMap<TypeId, MongoConnection>,
    bulk_options: BulkInsertOptions,
    bypass_document_validation: bool,
}

impl MongoConnectionStore {
    pub fn builder() -> MongoConnectionStoreBuilder {
        MongoConnectionStoreBuilder::new()
    }

    /// 实体类型的注册信息
    pub fn connection<T: DbModel>(&self) -> DataResult<&MongoConnection> {
        self.connections
            .get(&TypeId::of::<T>())
            .ok_or_else(|| DataError::CollectionNotRegistered(short_type_name::<T>()))
    }

    /// 实体类型对应的原始集合句柄
    pub fn collection<T: DbModel>(&self) -> DataResult<Collection<Document>> {
        let connection = self.connection::<T>()?;
        let client = self
            .clients
            .get(&connection.connection_string)
            .ok_or_else(|| DataError::ClientNotFound(connection.database_name.clone()))?;
        Ok(client
            .database(&connection.database_name)
            .collection::<Document>(&connection.collection_name))
    }

    /// 构建实体类型的仓储
    pub fn repository<T: DbModel>(&self) -> DataResult<MongoRepository<T>> {
        let connection = self.connection::<T>()?;
        let collection = self.collection::<T>()?;
        Ok(MongoRepository::new(
            collection,
            connection.discriminator().map(str::to_string),
        )
        .with_bulk_options(self.bulk_options.clone())
        .with_bypass_document_validation(self.bypass_document_validation))
    }
}
