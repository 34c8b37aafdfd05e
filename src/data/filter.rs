//! 查询过滤表达式
//!
//! `Filter` 同时支持两种后端：
//! - 内存后端：对实体序列化后的 BSON 文档直接求值（`matches`）
//! - MongoDB 后端：翻译为原生查询文档（`to_document`）
//!
//! 字段路径支持点号访问嵌套文档（如 `filter.scopes`）。数组字段遵循 MongoDB
//! 语义：任一元素满足条件即视为匹配。

use std::cmp::Ordering;

use mongodb::bson::{Bson, Document, doc};

/// 过滤表达式
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// 匹配全部
    #[default]
    All,
    Eq(String, Bson),
    Ne(String, Bson),
    Gt(String, Bson),
    Gte(String, Bson),
    Lt(String, Bson),
    Lte(String, Bson),
    In(String, Vec<Bson>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Lte(field.into(), value.into())
    }

    pub fn is_in<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// 数组字段包含指定元素
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// 与另一个条件组合（AND），`All` 作为单位元
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (left, right) => Filter::And(vec![left, right]),
        }
    }

    /// 与另一个条件组合（OR），`All` 吸收一切
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, _) | (_, Filter::All) => Filter::All,
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), f) => {
                left.push(f);
                Filter::Or(left)
            }
            (left, right) => Filter::Or(vec![left, right]),
        }
    }

    /// 翻译为 MongoDB 查询文档
    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => Document::new(),
            Filter::Eq(field, value) => doc! { field.as_str(): value.clone() },
            Filter::Ne(field, value) => doc! { field.as_str(): { "$ne": value.clone() } },
            Filter::Gt(field, value) => doc! { field.as_str(): { "$gt": value.clone() } },
            Filter::Gte(field, value) => doc! { field.as_str(): { "$gte": value.clone() } },
            Filter::Lt(field, value) => doc! { field.as_str(): { "$lt": value.clone() } },
            Filter::Lte(field, value) => doc! { field.as_str(): { "$lte": value.clone() } },
            Filter::In(field, values) => doc! { field.as_str(): { "$in": values.clone() } },
            Filter::And(filters) if filters.is_empty() => Document::new(),
            Filter::And(filters) => doc! {
                "$and": filters.iter().map(|f| Bson::Document(f.to_document())).collect::<Vec<_>>()
            },
            // 空 OR 不匹配任何文档
            Filter::Or(filters) if filters.is_empty() => doc! { "$nor": [{}] },
            Filter::Or(filters) => doc! {
                "$or": filters.iter().map(|f| Bson::Document(f.to_document())).collect::<Vec<_>>()
            },
        }
    }

    /// 在内存中对文档求值
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            // 与 MongoDB 一致：`{field: null}` 同时匹配缺失字段
            Filter::Eq(field, Bson::Null) if lookup(document, field).is_none() => true,
            Filter::Eq(field, value) => any_value(document, field, |v| values_equal(v, value)),
            Filter::Ne(field, Bson::Null) if lookup(document, field).is_none() => false,
            Filter::Ne(field, value) => !any_value(document, field, |v| values_equal(v, value)),
            Filter::Gt(field, value) => any_value(document, field, |v| {
                compare_values(v, value) == Some(Ordering::Greater)
            }),
            Filter::Gte(field, value) => any_value(document, field, |v| {
                matches!(compare_values(v, value), Some(Ordering::Greater | Ordering::Equal))
            }),
            Filter::Lt(field, value) => any_value(document, field, |v| {
                compare_values(v, value) == Some(Ordering::Less)
            }),
            Filter::Lte(field, value) => any_value(document, field, |v| {
                matches!(compare_values(v, value), Some(Ordering::Less | Ordering::Equal))
            }),
            Filter::In(field, values) => any_value(document, field, |v| {
                values.iter().any(|candidate| values_equal(v, candidate))
            }),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
        }
    }
}

/// 按点号路径查找字段
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn any_value(document: &Document, path: &str, predicate: impl Fn(&Bson) -> bool) -> bool {
    match lookup(document, path) {
        None => false,
        Some(Bson::Array(items)) => {
            predicate(&Bson::Array(items.clone())) || items.iter().any(&predicate)
        }
        Some(value) => predicate(value),
    }
}

fn values_equal(left: &Bson, right: &Bson) -> bool {
    match compare_values(left, right) {
        Some(ordering) => ordering == Ordering::Equal,
        None => left == right,
    }
}

/// 比较两个 BSON 值，不可比较时返回 None
///
/// 整数之间按 i64 比较，避免大整数（如时间刻度 ID）经 f64 转换丢失精度。
pub fn compare_values(left: &Bson, right: &Bson) -> Option<Ordering> {
    match (left, right) {
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            Some(as_i64(left)?.cmp(&as_i64(right)?))
        }
        (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_), Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => {
            as_f64(left)?.partial_cmp(&as_f64(right)?)
        }
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => Some(a.timestamp_millis().cmp(&b.timestamp_millis())),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        (Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
        _ => None,
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}
