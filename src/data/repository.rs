//! 通用仓储接口定义（Port）
//!
//! 接口按能力拆分（查询 / 写入 / Upsert / 删除 / 批量插入），`Repository`
//! 组合全部能力。内存后端与 MongoDB 后端实现同一组接口。

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;

use async_trait::async_trait;
use mongodb::bson::Bson;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::data::filter::Filter;
use crate::data::query::QueryResult;
use crate::error::{DataError, DataResult};

/// 主键字段名（两个后端统一使用 `_id`）
pub const ID_FIELD: &str = "_id";

/// 可持久化实体
pub trait DbModel: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + Into<Bson> + 'static;

    fn id(&self) -> Self::Key;
}

#[async_trait]
pub trait QueryRepository<T: DbModel>: Send + Sync {
    /// 按主键读取；不存在返回 None
    async fn get_by_id(&self, key: &T::Key, cancel: &CancellationToken) -> DataResult<Option<T>>;

    /// 构造延迟查询，此时不访问存储
    fn query(&self, filter: Filter, cancel: &CancellationToken) -> QueryResult<T>;

    fn get_all(&self, cancel: &CancellationToken) -> QueryResult<T> {
        self.query(Filter::All, cancel)
    }
}

#[async_trait]
pub trait OperationalRepository<T: DbModel>: Send + Sync {
    /// 插入实体；主键已存在时返回 `DataError::DuplicateKey`
    async fn insert(&self, entity: T, cancel: &CancellationToken) -> DataResult<()>;

    /// 替换已存在的实体；主键不存在返回 false
    async fn update(&self, key: &T::Key, entity: T, cancel: &CancellationToken) -> DataResult<bool>;
}

#[async_trait]
pub trait UpsertRepository<T: DbModel>: OperationalRepository<T> {
    /// 存在则替换，不存在则插入；写入成功返回 true
    async fn upsert(&self, key: &T::Key, entity: T, cancel: &CancellationToken) -> DataResult<bool>;
}

#[async_trait]
pub trait DeletableRepository<T: DbModel>: Send + Sync {
    async fn delete(&self, key: &T::Key, cancel: &CancellationToken) -> DataResult<bool>;

    /// 删除全部匹配项；没有删除任何记录时返回 false
    async fn delete_many(&self, filter: Filter, cancel: &CancellationToken) -> DataResult<bool>;
}

#[async_trait]
pub trait InsertBulkRepository<T: DbModel>: Send + Sync {
    /// 分批顺序插入，限流时只重试当前批次中未插入的部分
    async fn insert_bulk(&self, entities: Vec<T>, cancel: &CancellationToken) -> DataResult<()>;
}

/// 完整仓储能力
pub trait Repository<T: DbModel>:
    QueryRepository<T> + UpsertRepository<T> + DeletableRepository<T> + InsertBulkRepository<T>
{
}

impl<T, R> Repository<T> for R
where
    T: DbModel,
    R: QueryRepository<T> + UpsertRepository<T> + DeletableRepository<T> + InsertBulkRepository<T>,
{
}

/// 在取消令牌触发时中止存储操作
pub async fn cancellable<T, F>(cancel: &CancellationToken, operation: F) -> DataResult<T>
where
    F: Future<Output = DataResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(DataError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DataError::Cancelled),
        result = operation => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancellable_passes_result_through() {
        let cancel = CancellationToken::new();
        let value = cancellable(&cancel, async { Ok::<_, DataError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancellable_aborts_pending_operation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: DataResult<()> = cancellable(&cancel, async {
            std::future::pending::<()>().await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(DataError::Cancelled)));
    }
}
