//! 工具函数模块
//!
//! 提供时钟服务、字符串校验与去重等通用工具函数

pub mod clock;
pub mod helpers;

pub use clock::{DateTimeService, ManualDateTimeService, SystemDateTimeService};
pub use helpers::ServiceHelper;

use std::collections::HashSet;

/// 字符串为空或只包含空白字符
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// 集合非空且每个元素都不是空白
pub fn all_non_blank<S: AsRef<str>>(values: &[S]) -> bool {
    !values.is_empty() && values.iter().all(|v| !is_blank(v.as_ref()))
}

/// 去重并保持首次出现的顺序
pub fn distinct_ordered<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(Into::into)
        .filter(|value: &String| seen.insert(value.clone()))
        .collect()
}
