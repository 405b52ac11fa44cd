//! 查询模型模块
//!
//! 定义类型化的过滤表达式、排序、投影与分页状态，
//! 以及将查询字符串翻译为这些类型的流式构建器。
//! 过滤表达式由标签联合直接构造，不经过任何字符串改写

mod builder;
pub mod pagination;


pub use builder::ListQuery;
pub use pagination::{PaginationResult, paginate_response};

use std::collections::BTreeMap;

/// 过滤值标量
///
/// 查询字符串中的值都是文本；能整洁解析为布尔/整数/浮点的
/// 值在构建时完成强制转换，其余保持文本
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    /// 从原始文本解析，优先级：布尔 > 整数 > 浮点 > 文本
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(n) = raw.parse::<i64>() {
            return Self::Int(n);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Text(raw.to_string())
    }
}

/// 单字段上的比较约束
///
/// `Other` 承载未识别的方括号算子，原样传递给存储层，
/// 由存储层自行拒绝或忽略
#[derive(Clone, Debug, PartialEq)]
pub enum Comparison {
    Gte(FilterValue),
    Gt(FilterValue),
    Lte(FilterValue),
    Lt(FilterValue),
    Ne(FilterValue),
    In(Vec<FilterValue>),
    Nin(Vec<FilterValue>),
    Other(String, FilterValue),
}

/// 字段谓词：等值或比较约束的合取
#[derive(Clone, Debug, PartialEq)]
pub enum FieldPredicate {
    Eq(FilterValue),
    Cmp(Vec<Comparison>),
}

/// 过滤表达式标签联合
///
/// `Fields` 内各字段谓词取合取；`Contains` 为大小写不敏感的
/// 子串匹配，用于搜索阶段
#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpression {
    Fields(BTreeMap<String, FieldPredicate>),
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
    Contains { field: String, needle: String },
}

impl FilterExpression {
    /// 与另一表达式取交集，`And` 节点就地展平
    pub fn and(self, other: FilterExpression) -> FilterExpression {
        match (self, other) {
            (FilterExpression::And(mut lhs), FilterExpression::And(rhs)) => {
                lhs.extend(rhs);
                FilterExpression::And(lhs)
            }
            (FilterExpression::And(mut lhs), rhs) => {
                lhs.push(rhs);
                FilterExpression::And(lhs)
            }
            (lhs, FilterExpression::And(mut rhs)) => {
                rhs.insert(0, lhs);
                FilterExpression::And(rhs)
            }
            (lhs, rhs) => FilterExpression::And(vec![lhs, rhs]),
        }
    }
}

/// 排序键，`ascending = false` 表示降序
#[derive(Clone, Debug, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// 投影规格
///
/// `Include` 为白名单（标识字段 `_id` 恒定返回）；
/// `Exclude` 为黑名单，默认只排除内部修订字段
#[derive(Clone, Debug, PartialEq)]
pub enum ProjectionSpec {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

/// 分页状态，不变式 `skip = (page - 1) * limit`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationState {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
}

impl PaginationState {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page,
            limit,
            skip: page.saturating_sub(1) * limit,
        }
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// 一次查询的完整执行计划，由链式句柄累积、存储后端消费
#[derive(Clone, Debug, Default)]
pub struct QueryPlan {
    pub filter: Option<FilterExpression>,
    pub sort: Vec<SortKey>,
    pub projection: Option<ProjectionSpec>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}
