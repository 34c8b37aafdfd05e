//! 延迟查询结果
//!
//! `QueryResult` 只保存过滤表达式和数据源句柄，在调用 `get` / `total_count`
//! 或分页时才访问存储。同一个 `QueryResult` 可以重复执行，每次都读取最新数据。

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::Document;
use tokio_util::sync::CancellationToken;

use crate::data::filter::{Filter, compare_values, lookup};
use crate::data::paging::PagingRepositoryResult;
use crate::error::DataResult;

/// 排序键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// 翻译为 MongoDB 排序文档
pub fn sort_document(keys: &[SortKey]) -> Option<Document> {
    if keys.is_empty() {
        return None;
    }
    let mut sort = Document::new();
    for key in keys {
        sort.insert(key.field.clone(), if key.descending { -1 } else { 1 });
    }
    Some(sort)
}

/// 按排序键比较两个文档，缺失或不可比较的字段视为相等
pub fn compare_documents(left: &Document, right: &Document, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = match (lookup(left, &key.field), lookup(right, &key.field)) {
            (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// 查询窗口：排序 + 跳过 + 限制
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryWindow {
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl QueryWindow {
    pub fn all() -> Self {
        Self::default()
    }
}

/// 查询数据源（由具体存储后端实现）
#[async_trait]
pub trait QuerySource<T>: Send + Sync {
    /// 统计匹配数量
    async fn count(&self, filter: &Filter, cancel: &CancellationToken) -> DataResult<u64>;

    /// 读取匹配的实体
    async fn fetch(
        &self,
        filter: &Filter,
        window: &QueryWindow,
        cancel: &CancellationToken,
    ) -> DataResult<Vec<T>>;
}

/// 延迟、可重复执行的查询结果
pub struct QueryResult<T> {
    source: Arc<dyn QuerySource<T>>,
    filter: Filter,
    cancel: CancellationToken,
}

impl<T> Clone for QueryResult<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            filter: self.filter.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T: Send + 'static> QueryResult<T> {
    pub fn new(source: Arc<dyn QuerySource<T>>, filter: Filter, cancel: CancellationToken) -> Self {
        Self {
            source,
            filter,
            cancel,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// 统计匹配数量（每次调用都会访问存储）
    pub async fn total_count(&self) -> DataResult<u64> {
        self.source.count(&self.filter, &self.cancel).await
    }

    /// 是否存在匹配项
    pub async fn any(&self) -> DataResult<bool> {
        Ok(self.total_count().await? > 0)
    }

    /// 读取全部匹配项
    pub async fn get(&self) -> DataResult<Vec<T>> {
        self.source
            .fetch(&self.filter, &QueryWindow::all(), &self.cancel)
            .await
    }

    /// 按指定顺序读取全部匹配项
    pub async fn get_ordered(&self, sort: &[SortKey]) -> DataResult<Vec<T>> {
        let window = QueryWindow {
            sort: sort.to_vec(),
            ..QueryWindow::default()
        };
        self.source.fetch(&self.filter, &window, &self.cancel).await
    }

    /// 读取第一个匹配项
    pub async fn first(&self) -> DataResult<Option<T>> {
        let window = QueryWindow {
            limit: Some(1),
            ..QueryWindow::default()
        };
        let mut items = self.source.fetch(&self.filter, &window, &self.cancel).await?;
        Ok(if items.is_empty() {
            None
        } else {
            Some(items.swap_remove(0))
        })
    }

    /// 转换为分页查询
    ///
    /// `want_total_count` 为 false 时不统计总数，导航信息按 0 条计算。
    pub fn to_paging(&self, want_total_count: bool, page_size: usize) -> PagingRepositoryResult<T> {
        PagingRepositoryResult::new(
            Arc::clone(&self.source),
            self.filter.clone(),
            page_size,
            want_total_count,
            self.cancel.clone(),
        )
    }
}
