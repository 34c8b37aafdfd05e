//! 分页计算与分页结果
//!
//! `PageMetrics` 是纯函数：由 `(total_count, page_size, current_page)` 推导
//! 页数与前后页导航信息。`PagingResult` 在首次访问时计算一次总数和导航信息并缓存。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::data::filter::Filter;
use crate::data::query::{QuerySource, QueryWindow, SortKey};
use crate::error::DataResult;

/// 分页导航信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMetrics {
    pub page_count: usize,
    pub next_page: usize,
    pub previous_page: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageMetrics {
    /// 计算分页导航信息
    ///
    /// 越界页（`current_page >= page_count`）的前一页被夹紧到最后一个有效页。
    pub fn compute(total_count: u64, page_size: usize, current_page: usize) -> Self {
        let page_count = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(page_size as u64) as usize
        };
        let last_page = page_count.saturating_sub(1);

        let has_next_page = current_page + 1 < page_count;
        let next_page = if has_next_page {
            last_page.min(current_page + 1)
        } else {
            last_page
        };

        let has_previous_page = current_page > 0;
        let previous_page = if has_previous_page {
            current_page.min(last_page + 1).saturating_sub(1)
        } else {
            0
        };

        Self {
            page_count,
            next_page,
            previous_page,
            has_next_page,
            has_previous_page,
        }
    }
}

/// 分页数据快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagingData<T> {
    pub page_size: usize,
    pub current_page: usize,
    pub total_count: u64,
    pub page_count: usize,
    pub next_page: usize,
    pub previous_page: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub result: Vec<T>,
}

/// 可分页的查询结果
///
/// 在分页之前可以追加排序条件（`order_by` / `then_by` 及其降序版本）。
pub struct PagingRepositoryResult<T> {
    source: Arc<dyn QuerySource<T>>,
    filter: Filter,
    sort: Vec<SortKey>,
    page_size: usize,
    want_total_count: bool,
    cancel: CancellationToken,
}

impl<T> Clone for PagingRepositoryResult<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            page_size: self.page_size,
            want_total_count: self.want_total_count,
            cancel: self.cancel.clone(),
        }
    }
}

impl<T: Send + 'static> PagingRepositoryResult<T> {
    pub(crate) fn new(
        source: Arc<dyn QuerySource<T>>,
        filter: Filter,
        page_size: usize,
        want_total_count: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            filter,
            sort: Vec::new(),
            page_size,
            want_total_count,
            cancel,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    /// 按字段升序排序（覆盖已有排序）
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.sort = vec![SortKey::ascending(field)];
        self
    }

    /// 按字段降序排序（覆盖已有排序）
    pub fn order_by_descending(mut self, field: impl Into<String>) -> Self {
        self.sort = vec![SortKey::descending(field)];
        self
    }

    /// 追加升序排序键；尚未排序时等价于 `order_by`
    pub fn then_by(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey::ascending(field));
        self
    }

    /// 追加降序排序键；尚未排序时等价于 `order_by_descending`
    pub fn then_by_descending(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey::descending(field));
        self
    }

    /// 获取指定页
    pub fn get_page(&self, page_no: usize) -> PagingResult<T> {
        PagingResult {
            query: self.clone(),
            current_page: page_no,
            total_count: OnceCell::new(),
            metrics: OnceCell::new(),
            data: OnceCell::new(),
        }
    }

    /// 直接获取指定页的数据
    pub async fn get_data(&self, page_no: usize) -> DataResult<Vec<T>> {
        self.fetch_page(page_no).await
    }

    async fn fetch_page(&self, page_no: usize) -> DataResult<Vec<T>> {
        if self.page_size == 0 {
            return Ok(Vec::new());
        }
        let window = QueryWindow {
            sort: self.sort.clone(),
            skip: (page_no as u64).saturating_mul(self.page_size as u64),
            limit: Some(self.page_size as u64),
        };
        self.source.fetch(&self.filter, &window, &self.cancel).await
    }
}

/// 单页结果
///
/// 总数、导航信息和页内数据都在首次访问时计算并缓存。
pub struct PagingResult<T> {
    query: PagingRepositoryResult<T>,
    current_page: usize,
    total_count: OnceCell<u64>,
    metrics: OnceCell<PageMetrics>,
    data: OnceCell<Vec<T>>,
}

impl<T: Send + Sync + 'static> PagingResult<T> {
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.query.page_size
    }

    /// 总记录数；未要求统计总数时为 0
    pub async fn total_count(&self) -> DataResult<u64> {
        let total = self
            .total_count
            .get_or_try_init(|| async {
                if !self.query.want_total_count {
                    return Ok(0);
                }
                self.query
                    .source
                    .count(&self.query.filter, &self.query.cancel)
                    .await
            })
            .await?;
        Ok(*total)
    }

    /// 分页导航信息
    pub async fn metrics(&self) -> DataResult<PageMetrics> {
        let metrics = self
            .metrics
            .get_or_try_init(|| async {
                let total = self.total_count().await?;
                Ok::<_, crate::error::DataError>(PageMetrics::compute(
                    total,
                    self.query.page_size,
                    self.current_page,
                ))
            })
            .await?;
        Ok(*metrics)
    }

    pub async fn page_count(&self) -> DataResult<usize> {
        Ok(self.metrics().await?.page_count)
    }

    pub async fn next_page(&self) -> DataResult<usize> {
        Ok(self.metrics().await?.next_page)
    }

    pub async fn previous_page(&self) -> DataResult<usize> {
        Ok(self.metrics().await?.previous_page)
    }

    pub async fn has_next_page(&self) -> DataResult<bool> {
        Ok(self.metrics().await?.has_next_page)
    }

    pub async fn has_previous_page(&self) -> DataResult<bool> {
        Ok(self.metrics().await?.has_previous_page)
    }

    /// 当前页数据
    pub async fn data(&self) -> DataResult<&[T]> {
        let data = self
            .data
            .get_or_try_init(|| self.query.fetch_page(self.current_page))
            .await?;
        Ok(data.as_slice())
    }
}

impl<T: Clone + Send + Sync + 'static> PagingResult<T> {
    /// 生成分页数据快照
    pub async fn to_paging_data(&self) -> DataResult<PagingData<T>> {
        let total_count = self.total_count().await?;
        let metrics = self.metrics().await?;
        let result = self.data().await?.to_vec();
        Ok(PagingData {
            page_size: self.query.page_size,
            current_page: self.current_page,
            total_count,
            page_count: metrics.page_count,
            next_page: metrics.next_page,
            previous_page: metrics.previous_page,
            has_next_page: metrics.has_next_page,
            has_previous_page: metrics.has_previous_page,
            result,
        })
    }
}
