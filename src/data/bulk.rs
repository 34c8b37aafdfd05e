//! 批量插入引擎
//!
//! 把实体按批次顺序写入；后端报告限流时，只重试当前批次中尚未写入的部分，
//! 每次重试前等待一个带随机抖动的短暂退避。

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{DataError, DataResult};

/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// 批量插入配置
#[derive(Debug, Clone)]
pub struct BulkInsertOptions {
    /// 每批实体数量
    pub batch_size: usize,
    /// 限流退避基础时长
    pub backoff_base: Duration,
    /// 限流退避随机抖动上限
    pub backoff_jitter: Duration,
    /// 单个批次允许的最大限流重试次数
    pub max_rate_limit_retries: u32,
}

impl Default for BulkInsertOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            backoff_base: Duration::from_millis(100),
            backoff_jitter: Duration::from_millis(200),
            max_rate_limit_retries: 10,
        }
    }
}

impl BulkInsertOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// 计算一次限流退避时长
    pub fn backoff(&self) -> Duration {
        let jitter_ms = self.backoff_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.backoff_base + Duration::from_millis(jitter)
    }
}

/// 单批写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// 整批写入完成
    Completed,
    /// 被限流：批次前 `inserted` 个已写入
    RateLimited { inserted: usize },
}

/// 分批写入实体
///
/// `write_batch` 负责把一批实体写入后端，并把限流错误翻译为
/// `BatchOutcome::RateLimited`。
pub async fn insert_in_batches<T, F, Fut>(
    entities: Vec<T>,
    options: &BulkInsertOptions,
    cancel: &CancellationToken,
    mut write_batch: F,
) -> DataResult<()>
where
    T: Clone,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = DataResult<BatchOutcome>>,
{
    if options.batch_size == 0 {
        return Err(DataError::InvalidConfiguration(
            "bulk insert batch size must be positive".to_string(),
        ));
    }

    let total = entities.len();
    let mut remaining = entities;
    let mut batch_no = 0usize;

    while !remaining.is_empty() {
        let rest = remaining.split_off(options.batch_size.min(remaining.len()));
        let mut pending = std::mem::replace(&mut remaining, rest);
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(DataError::Cancelled);
            }

            match write_batch(pending.clone()).await? {
                BatchOutcome::Completed => break,
                BatchOutcome::RateLimited { inserted } => {
                    attempts += 1;
                    pending = pending.split_off(inserted.min(pending.len()));
                    if pending.is_empty() {
                        break;
                    }
                    if attempts > options.max_rate_limit_retries {
                        return Err(DataError::RateLimitExhausted {
                            remaining: pending.len() + remaining.len(),
                            attempts,
                        });
                    }

                    let delay = options.backoff();
                    warn!(
                        batch_no,
                        attempts,
                        remaining = pending.len(),
                        delay_ms = delay.as_millis() as u64,
                        "Bulk insert rate limited, retrying remainder of batch"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(DataError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        batch_no += 1;
    }

    debug!(total, batches = batch_no, "Bulk insert completed");
    Ok(())
}
