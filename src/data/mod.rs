//! 通用数据访问层
//!
//! - `repository`：仓储接口（Port）与实体约束 `DbModel`
//! - `filter` / `query` / `paging`：过滤表达式、延迟查询结果与分页
//! - `memory` / `mongo`：两个可互换的存储后端
//! - `bulk`：带限流重试的批量插入引擎

pub mod bulk;
pub mod filter;
pub mod memory;
pub mod mongo;
pub mod paging;
pub mod query;
pub mod repository;

pub use bulk::{BatchOutcome, BulkInsertOptions, DEFAULT_BATCH_SIZE};
pub use filter::Filter;
pub use memory::InMemoryRepository;
pub use mongo::{MongoConnectionStore, MongoConnectionStoreBuilder, MongoRepository};
pub use paging::{PageMetrics, PagingData, PagingRepositoryResult, PagingResult};
pub use query::{QueryResult, QuerySource, QueryWindow, SortKey};
pub use repository::{
    DbModel, DeletableRepository, ID_FIELD, InsertBulkRepository, OperationalRepository,
    QueryRepository, Repository, UpsertRepository, cancellable,
};
