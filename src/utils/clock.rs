//! 时钟服务
//!
//! 业务代码通过 `DateTimeService` 获取当前时间，便于在测试中注入可控时钟。
//! 同时提供 `yyyyMMddHHmmss` 数字格式的转换。

use std::sync::RwLock;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

/// 数字时间格式（yyyyMMddHHmmss）
pub const NUMERIC_FORMAT: &str = "%Y%m%d%H%M%S";

/// 时钟服务接口
pub trait DateTimeService: Send + Sync {
    /// 当前 UTC 时间
    fn utc_now(&self) -> DateTime<Utc>;

    /// 格式化为 yyyyMMddHHmmss
    fn numeric_string(&self, value: DateTime<Utc>) -> String {
        value.format(NUMERIC_FORMAT).to_string()
    }

    /// 当前时间的 yyyyMMddHHmmss 表示
    fn utc_now_numeric(&self) -> String {
        self.numeric_string(self.utc_now())
    }

    /// 解析 yyyyMMddHHmmss；格式不合法返回 None
    fn parse_numeric(&self, value: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(value.trim(), NUMERIC_FORMAT)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDateTimeService;

impl DateTimeService for SystemDateTimeService {
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟
#[derive(Debug)]
pub struct ManualDateTimeService {
    now: RwLock<DateTime<Utc>>,
}

impl ManualDateTimeService {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, value: DateTime<Utc>) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = value;
    }

    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += delta;
    }
}

impl DateTimeService for ManualDateTimeService {
    fn utc_now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_format_round_trip() {
        let clock = SystemDateTimeService;
        let value = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let text = clock.numeric_string(value);
        assert_eq!(text, "20240309070501");
        assert_eq!(clock.parse_numeric(&text), Some(value));
    }

    #[test]
    fn test_parse_numeric_rejects_garbage() {
        let clock = SystemDateTimeService;
        assert_eq!(clock.parse_numeric("2024-03-09"), None);
        assert_eq!(clock.parse_numeric(""), None);
    }

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualDateTimeService::new(start);
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.utc_now(), start + Duration::minutes(5));
        clock.set(start);
        assert_eq!(clock.utc_now_numeric(), "20240101000000");
    }
}
