//! 内存仓储实现
//!
//! 以主键为索引的 HashMap，适用于测试和单实例部署（单写者假设）。
//! 过滤与排序在实体序列化后的 BSON 文档上求值，语义与 MongoDB 后端一致。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{self, Document};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::data::bulk::{BatchOutcome, BulkInsertOptions, insert_in_batches};
use crate::data::filter::Filter;
use crate::data::query::{QueryResult, QuerySource, QueryWindow, compare_documents};
use crate::data::repository::{
    DbModel, DeletableRepository, InsertBulkRepository, OperationalRepository, QueryRepository,
    UpsertRepository,
};
use crate::error::{DataError, DataResult};

type Store<T> = Arc<RwLock<HashMap<<T as DbModel>::Key, T>>>;

/// 内存仓储
pub struct InMemoryRepository<T: DbModel> {
    data: Store<T>,
    bulk_options: BulkInsertOptions,
}

impl<T: DbModel> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DbModel> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            bulk_options: BulkInsertOptions::default(),
        }
    }

    pub fn with_bulk_options(mut self, options: BulkInsertOptions) -> Self {
        self.bulk_options = options;
        self
    }

    /// 当前实体数量
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    fn source(&self) -> Arc<dyn QuerySource<T>> {
        Arc::new(InMemoryQuerySource {
            data: Arc::clone(&self.data),
        })
    }
}

fn ensure_active(cancel: &CancellationToken) -> DataResult<()> {
    if cancel.is_cancelled() {
        Err(DataError::Cancelled)
    } else {
        Ok(())
    }
}

struct InMemoryQuerySource<T: DbModel> {
    data: Store<T>,
}

impl<T: DbModel> InMemoryQuerySource<T> {
    async fn matching(&self, filter: &Filter) -> DataResult<Vec<(Document, T)>> {
        let data = self.data.read().await;
        let mut matched = Vec::new();
        for entity in data.values() {
            let document = bson::to_document(entity)?;
            if filter.matches(&document) {
                matched.push((document, entity.clone()));
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl<T: DbModel> QuerySource<T> for InMemoryQuerySource<T> {
    async fn count(&self, filter: &Filter, cancel: &CancellationToken) -> DataResult<u64> {
        ensure_active(cancel)?;
        if matches!(filter, Filter::All) {
            return Ok(self.data.read().await.len() as u64);
        }
        Ok(self.matching(filter).await?.len() as u64)
    }

    async fn fetch(
        &self,
        filter: &Filter,
        window: &QueryWindow,
        cancel: &CancellationToken,
    ) -> DataResult<Vec<T>> {
        ensure_active(cancel)?;
        let mut matched = self.matching(filter).await?;
        if !window.sort.is_empty() {
            matched.sort_by(|(a, _), (b, _)| compare_documents(a, b, &window.sort));
        }

        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let take = window
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(_, entity)| entity)
            .collect())
    }
}

#[async_trait]
impl<T: DbModel> QueryRepository<T> for InMemoryRepository<T> {
    async fn get_by_id(&self, key: &T::Key, cancel: &CancellationToken) -> DataResult<Option<T>> {
        ensure_active(cancel)?;
        Ok(self.data.read().await.get(key).cloned())
    }

    fn query(&self, filter: Filter, cancel: &CancellationToken) -> QueryResult<T> {
        QueryResult::new(self.source(), filter, cancel.clone())
    }
}

#[async_trait]
impl<T: DbModel> OperationalRepository<T> for InMemoryRepository<T> {
    async fn insert(&self, entity: T, cancel: &CancellationToken) -> DataResult<()> {
        ensure_active(cancel)?;
        let mut data = self.data.write().await;
        let key = entity.id();
        if data.contains_key(&key) {
            return Err(DataError::DuplicateKey(format!("{key:?}")));
        }
        data.insert(key, entity);
        Ok(())
    }

    async fn update(&self, key: &T::Key, entity: T, cancel: &CancellationToken) -> DataResult<bool> {
        ensure_active(cancel)?;
        let mut data = self.data.write().await;
        match data.get_mut(key) {
            Some(existing) => {
                *existing = entity;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl<T: DbModel> UpsertRepository<T> for InMemoryRepository<T> {
    async fn upsert(&self, key: &T::Key, entity: T, cancel: &CancellationToken) -> DataResult<bool> {
        ensure_active(cancel)?;
        self.data.write().await.insert(key.clone(), entity);
        Ok(true)
    }
}

#[async_trait]
impl<T: DbModel> DeletableRepository<T> for InMemoryRepository<T> {
    async fn delete(&self, key: &T::Key, cancel: &CancellationToken) -> DataResult<bool> {
        ensure_active(cancel)?;
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn delete_many(&self, filter: Filter, cancel: &CancellationToken) -> DataResult<bool> {
        ensure_active(cancel)?;
        let mut data = self.data.write().await;
        let mut doomed = Vec::new();
        for (key, entity) in data.iter() {
            if filter.matches(&bson::to_document(entity)?) {
                doomed.push(key.clone());
            }
        }
        for key in &doomed {
            data.remove(key);
        }
        Ok(!doomed.is_empty())
    }
}

#[async_trait]
impl<T: DbModel> InsertBulkRepository<T> for InMemoryRepository<T> {
    async fn insert_bulk(&self, entities: Vec<T>, cancel: &CancellationToken) -> DataResult<()> {
        let data = Arc::clone(&self.data);
        insert_in_batches(entities, &self.bulk_options, cancel, move |batch: Vec<T>| {
            let data = Arc::clone(&data);
            async move {
                let mut data = data.write().await;
                // 与有序 insert_many 一致：遇到重复主键即停止，之前的实体保留
                for entity in batch {
                    let key = entity.id();
                    if data.contains_key(&key) {
                        return Err(DataError::DuplicateKey(format!("{key:?}")));
                    }
                    data.insert(key, entity);
                }
                Ok(BatchOutcome::Completed)
            }
        })
        .await
    }
}
