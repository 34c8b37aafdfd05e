//! 基于时钟刻度的消息 ID 生成器

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use flare_message_center_core::DateTimeService;

use crate::domain::repository::MessageIdGenerator;

/// 每个刻度的纳秒数（100ns）
const NANOS_PER_TICK: i64 = 100;

/// 时间刻度 ID：自 Unix 纪元起的 100ns 刻度数；同一刻度内递增
pub struct TickMessageIdGenerator {
    clock: Arc<dyn DateTimeService>,
    last: AtomicI64,
}

impl TickMessageIdGenerator {
    pub fn new(clock: Arc<dyn DateTimeService>) -> Self {
        Self {
            clock,
            last: AtomicI64::new(0),
        }
    }
}

/// 时间点对应的刻度数
pub fn ticks(value: DateTime<Utc>) -> i64 {
    value
        .timestamp_nanos_opt()
        .map(|nanos| nanos / NANOS_PER_TICK)
        .unwrap_or_else(|| value.timestamp_micros().saturating_mul(10))
}

impl MessageIdGenerator for TickMessageIdGenerator {
    fn next_id(&self) -> i64 {
        let now = ticks(self.clock.utc_now());
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }
}
