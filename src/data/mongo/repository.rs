//! MongoDB 仓储实现
//!
//! 使用 `Collection<Document>` 读写：实体先序列化为 BSON 文档，开启鉴别时写入
//! `_t` 字段，并在所有查询中追加 `_t` 条件。

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, InsertManyOptions, InsertOneOptions, ReplaceOptions};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::data::bulk::{BatchOutcome, BulkInsertOptions, insert_in_batches};
use crate::data::filter::Filter;
use crate::data::mongo::connection::DISCRIMINATOR_FIELD;
use crate::data::query::{QueryResult, QuerySource, QueryWindow, sort_document};
use crate::data::repository::{
    DbModel, DeletableRepository, ID_FIELD, InsertBulkRepository, OperationalRepository,
    QueryRepository, UpsertRepository, cancellable,
};
use crate::error::{DataError, DataResult};

/// 重复主键错误码
pub const DUPLICATE_KEY_CODE: i32 = 11000;
/// 请求速率超限错误码
pub const RATE_LIMITED_CODE: i32 = 16500;

/// 鉴别上下文：负责查询条件追加与文档转换
#[derive(Debug, Clone)]
struct Scope {
    discriminator: Option<String>,
}

impl Scope {
    fn filter(&self, filter: &Filter) -> Document {
        let native = filter.to_document();
        match &self.discriminator {
            None => native,
            Some(name) if native.is_empty() => doc! { DISCRIMINATOR_FIELD: name.as_str() },
            Some(name) => doc! { "$and": [native, { DISCRIMINATOR_FIELD: name.as_str() }] },
        }
    }

    fn key_filter(&self, key: Bson) -> Document {
        self.filter(&Filter::Eq(ID_FIELD.to_string(), key))
    }

    fn to_stored<T: DbModel>(&self, entity: &T) -> DataResult<Document> {
        let mut document = bson::to_document(entity)?;
        if let Some(name) = &self.discriminator {
            document.insert(DISCRIMINATOR_FIELD, name.as_str());
        }
        Ok(document)
    }

    fn from_stored<T: DbModel>(&self, mut document: Document) -> DataResult<T> {
        document.remove(DISCRIMINATOR_FIELD);
        Ok(bson::from_document(document)?)
    }
}

/// MongoDB 仓储
pub struct MongoRepository<T: DbModel> {
    collection: Collection<Document>,
    scope: Scope,
    bulk_options: BulkInsertOptions,
    bypass_document_validation: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DbModel> MongoRepository<T> {
    pub fn new(collection: Collection<Document>, discriminator: Option<String>) -> Self {
        Self {
            collection,
            scope: Scope { discriminator },
            bulk_options: BulkInsertOptions::default(),
            bypass_document_validation: true,
            _marker: PhantomData,
        }
    }

    pub fn with_bulk_options(mut self, options: BulkInsertOptions) -> Self {
        self.bulk_options = options;
        self
    }

    pub fn with_bypass_document_validation(mut self, bypass: bool) -> Self {
        self.bypass_document_validation = bypass;
        self
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    fn replace_options(&self, upsert: bool) -> ReplaceOptions {
        ReplaceOptions::builder()
            .upsert(upsert)
            .bypass_document_validation(self.bypass_document_validation)
            .build()
    }
}

/// 写入错误分类
fn map_write_error(error: mongodb::error::Error) -> DataError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = error.kind.as_ref() {
        if write_error.code == DUPLICATE_KEY_CODE {
            return DataError::DuplicateKey(write_error.message.clone());
        }
    }
    DataError::Mongo(error)
}

/// 识别批量插入中的限流错误，返回限流前已写入的数量
///
/// 有序写入在第一个错误处停止，因此错误下标即为已写入数量。
fn rate_limited_prefix(error: &mongodb::error::Error) -> Option<usize> {
    match error.kind.as_ref() {
        ErrorKind::BulkWrite(failure) => {
            let first = failure
                .write_errors
                .as_ref()?
                .iter()
                .min_by_key(|write_error| write_error.index)?;
            (first.code == RATE_LIMITED_CODE).then_some(first.index)
        }
        ErrorKind::Command(command_error) if command_error.code == RATE_LIMITED_CODE => Some(0),
        _ => None,
    }
}

fn map_bulk_error(error: mongodb::error::Error) -> DataError {
    if let ErrorKind::BulkWrite(failure) = error.kind.as_ref() {
        let duplicate = failure
            .write_errors
            .as_ref()
            .and_then(|errors| errors.iter().find(|e| e.code == DUPLICATE_KEY_CODE));
        if let Some(write_error) = duplicate {
            return DataError::DuplicateKey(write_error.message.clone());
        }
    }
    DataError::Mongo(error)
}

struct MongoQuerySource<T> {
    collection: Collection<Document>,
    scope: Scope,
    _marker: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T: DbModel> QuerySource<T> for MongoQuerySource<T> {
    async fn count(&self, filter: &Filter, cancel: &CancellationToken) -> DataResult<u64> {
        let native = self.scope.filter(filter);
        cancellable(cancel, async {
            Ok(self.collection.count_documents(native, None).await?)
        })
        .await
    }

    async fn fetch(
        &self,
        filter: &Filter,
        window: &QueryWindow,
        cancel: &CancellationToken,
    ) -> DataResult<Vec<T>> {
        let native = self.scope.filter(filter);
        let options = FindOptions::builder()
            .sort(sort_document(&window.sort))
            .skip((window.skip > 0).then_some(window.skip))
            .limit(window.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX)))
            .build();

        cancellable(cancel, async {
            let cursor = self.collection.find(native, options).await?;
            let documents: Vec<Document> = cursor.try_collect().await?;
            documents
                .into_iter()
                .map(|document| self.scope.from_stored(document))
                .collect()
        })
        .await
    }
}

#[async_trait]
impl<T: DbModel> QueryRepository<T> for MongoRepository<T> {
    async fn get_by_id(&self, key: &T::Key, cancel: &CancellationToken) -> DataResult<Option<T>> {
        let filter = self.scope.key_filter(key.clone().into());
        cancellable(cancel, async {
            match self.collection.find_one(filter, None).await? {
                Some(document) => Ok(Some(self.scope.from_stored(document)?)),
                None => Ok(None),
            }
        })
        .await
    }

    fn query(&self, filter: Filter, cancel: &CancellationToken) -> QueryResult<T> {
        let source: Arc<dyn QuerySource<T>> = Arc::new(MongoQuerySource::<T> {
            collection: self.collection.clone(),
            scope: self.scope.clone(),
            _marker: PhantomData,
        });
        QueryResult::new(source, filter, cancel.clone())
    }
}

#[async_trait]
impl<T: DbModel> OperationalRepository<T> for MongoRepository<T> {
    async fn insert(&self, entity: T, cancel: &CancellationToken) -> DataResult<()> {
        let document = self.scope.to_stored(&entity)?;
        let options = InsertOneOptions::builder()
            .bypass_document_validation(self.bypass_document_validation)
            .build();
        cancellable(cancel, async {
            self.collection
                .insert_one(document, options)
                .await
                .map_err(map_write_error)?;
            Ok(())
        })
        .await
    }

    async fn update(&self, key: &T::Key, entity: T, cancel: &CancellationToken) -> DataResult<bool> {
        let filter = self.scope.key_filter(key.clone().into());
        let document = self.scope.to_stored(&entity)?;
        cancellable(cancel, async {
            let result = self
                .collection
                .replace_one(filter, document, self.replace_options(false))
                .await
                .map_err(map_write_error)?;
            Ok(result.matched_count > 0)
        })
        .await
    }
}

#[async_trait]
impl<T: DbModel> UpsertRepository<T> for MongoRepository<T> {
    async fn upsert(&self, key: &T::Key, entity: T, cancel: &CancellationToken) -> DataResult<bool> {
        let filter = self.scope.key_filter(key.clone().into());
        let document = self.scope.to_stored(&entity)?;
        cancellable(cancel, async {
            let result = self
                .collection
                .replace_one(filter, document, self.replace_options(true))
                .await
                .map_err(map_write_error)?;
            Ok(result.matched_count > 0 || result.upserted_id.is_some())
        })
        .await
    }
}

#[async_trait]
impl<T: DbModel> DeletableRepository<T> for MongoRepository<T> {
    async fn delete(&self, key: &T::Key, cancel: &CancellationToken) -> DataResult<bool> {
        let filter = self.scope.key_filter(key.clone().into());
        cancellable(cancel, async {
            let result = self.collection.delete_one(filter, None).await?;
            Ok(result.deleted_count > 0)
        })
        .await
    }

    async fn delete_many(&self, filter: Filter, cancel: &CancellationToken) -> DataResult<bool> {
        let native = self.scope.filter(&filter);
        cancellable(cancel, async {
            let result = self.collection.delete_many(native, None).await?;
            Ok(result.deleted_count > 0)
        })
        .await
    }
}

#[async_trait]
impl<T: DbModel> InsertBulkRepository<T> for MongoRepository<T> {
    async fn insert_bulk(&self, entities: Vec<T>, cancel: &CancellationToken) -> DataResult<()> {
        let collection = self.collection.clone();
        let scope = self.scope.clone();
        let bypass = self.bypass_document_validation;

        insert_in_batches(entities, &self.bulk_options, cancel, move |batch: Vec<T>| {
            let collection = collection.clone();
            let scope = scope.clone();
            async move {
                let documents = batch
                    .iter()
                    .map(|entity| scope.to_stored(entity))
                    .collect::<DataResult<Vec<_>>>()?;
                let options = InsertManyOptions::builder()
                    .ordered(true)
                    .bypass_document_validation(bypass)
                    .build();

                match collection.insert_many(documents, options).await {
                    Ok(result) => {
                        debug!(inserted = result.inserted_ids.len(), "Inserted batch");
                        Ok(BatchOutcome::Completed)
                    }
                    Err(error) => match rate_limited_prefix(&error) {
                        Some(inserted) => Ok(BatchOutcome::RateLimited { inserted }),
                        None => Err(map_bulk_error(error)),
                    },
                }
            }
        })
        .await
    }
}
