//! 列表查询构建器
//!
//! 将查询字符串按固定顺序翻译为执行计划：
//! 过滤 → 搜索 → 排序 → 投影 → 分页。
//! 每个阶段只写入自己的槽位，重复调用覆盖而非叠加；
//! 任何非法输入都退化为"不加约束"或"使用默认值"，绝不抛错

use std::collections::BTreeMap;

use anyhow::Result;
use mongodb::bson::Document;

use crate::collection::CollectionQuery;
use crate::config::QueryConfig;
use crate::params::{QueryParams, split_bracket_key};
use crate::query::{
    Comparison, FieldPredicate, FilterExpression, FilterValue, PaginationState, ProjectionSpec,
    SortKey,
};

/// 列表查询构建器
///
/// 每个请求构建一个实例，链式调用各阶段后消费执行；
/// 不持有任何跨请求状态，集合句柄由调用方提供
pub struct ListQuery {
    handle: CollectionQuery,
    params: QueryParams,
    config: QueryConfig,
    filter: Option<FilterExpression>,
    search: Option<FilterExpression>,
    sort: Option<Vec<SortKey>>,
    projection: Option<ProjectionSpec>,
    pagination: Option<PaginationState>,
}

impl ListQuery {
    /// 以内建默认值创建构建器
    pub fn new(handle: CollectionQuery, params: QueryParams) -> Self {
        Self::with_config(handle, params, QueryConfig::default())
    }

    /// 以显式查询配置创建构建器
    pub fn with_config(handle: CollectionQuery, params: QueryParams, config: QueryConfig) -> Self {
        Self {
            handle,
            params,
            config,
            filter: None,
            search: None,
            sort: None,
            projection: None,
            pagination: None,
        }
    }

    /// 过滤阶段
    ///
    /// 剔除保留键后，裸键生成等值谓词（同名多值生成成员谓词），
    /// 方括号键生成比较谓词；未识别的算子原样传递
    pub fn filter(mut self) -> Self {
        let mut grouped: BTreeMap<String, FieldAccumulator> = BTreeMap::new();
        for (key, value) in self.params.iter() {
            if QueryParams::is_reserved(key) {
                continue;
            }
            let (field, token) = split_bracket_key(key);
            let slot = grouped.entry(field.to_string()).or_default();
            match token {
                None => slot.equals.push(value.to_string()),
                Some(tok) => slot.comparisons.push((tok.to_string(), value.to_string())),
            }
        }

        let mut fields = BTreeMap::new();
        for (field, accumulated) in grouped {
            if let Some(predicate) = accumulated.into_predicate() {
                fields.insert(field, predicate);
            }
        }
        self.filter = if fields.is_empty() {
            None
        } else {
            Some(FilterExpression::Fields(fields))
        };
        self
    }

    /// 搜索阶段，使用配置的默认字段列表
    pub fn search(mut self) -> Self {
        let fields = self.config.search_fields.clone();
        self = self.search_with(&fields);
        self
    }

    /// 搜索阶段，显式指定字段列表
    ///
    /// `search` 参数存在时，对各字段构建大小写不敏感的子串
    /// 匹配并取并集，再与过滤阶段的谓词取交集；缺失时为空操作
    pub fn search_with<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.search = match self.params.get("search") {
            Some(needle) if !needle.is_empty() && !fields.is_empty() => {
                let branches = fields
                    .iter()
                    .map(|field| FilterExpression::Contains {
                        field: field.as_ref().to_string(),
                        needle: needle.to_string(),
                    })
                    .collect();
                Some(FilterExpression::Or(branches))
            }
            _ => None,
        };
        self
    }

    /// 排序阶段
    ///
    /// `sort` 参数按逗号拆分，`-` 前缀为降序；缺失或拆分为空时
    /// 回落到按创建时间戳降序的单键排序
    pub fn sort(mut self) -> Self {
        let keys = match self.params.get("sort") {
            Some(raw) => {
                let parsed: Vec<SortKey> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|token| !token.is_empty() && *token != "-")
                    .map(|token| match token.strip_prefix('-') {
                        Some(field) => SortKey::desc(field),
                        None => SortKey::asc(token),
                    })
                    .collect();
                if parsed.is_empty() {
                    vec![SortKey::desc(&self.config.created_field)]
                } else {
                    parsed
                }
            }
            None => vec![SortKey::desc(&self.config.created_field)],
        };
        self.sort = Some(keys);
        self
    }

    /// 投影阶段
    ///
    /// `fields` 参数给出白名单；缺失时只排除内部修订字段
    pub fn select(mut self) -> Self {
        let projection = match self.params.get("fields") {
            Some(raw) => {
                let included: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|field| !field.is_empty())
                    .map(String::from)
                    .collect();
                if included.is_empty() {
                    ProjectionSpec::Exclude(vec![self.config.revision_field.clone()])
                } else {
                    ProjectionSpec::Include(included)
                }
            }
            None => ProjectionSpec::Exclude(vec![self.config.revision_field.clone()]),
        };
        self.projection = Some(projection);
        self
    }

    /// 分页阶段
    ///
    /// `page`/`limit` 按十进制解析；缺失、非数字或非正数时
    /// 使用默认值，不抛错；配置了 `max_limit` 时收顶
    pub fn paginate(mut self) -> Self {
        let page = parse_positive(self.params.get("page")).unwrap_or(1);
        let mut limit =
            parse_positive(self.params.get("limit")).unwrap_or(self.config.default_limit);
        if let Some(cap) = self.config.max_limit {
            limit = limit.min(cap);
        }
        self.pagination = Some(PaginationState::new(page, limit));
        self
    }

    /// 构建细化后的窗口查询句柄
    ///
    /// 谓词阶段（过滤/搜索）先行收窄，分页窗口最后施加
    pub fn build(&self) -> CollectionQuery {
        let mut query = self.handle.clone();
        if let Some(portion) = self.filter_portion() {
            query = query.find(portion);
        }
        if let Some(keys) = &self.sort {
            query = query.sort(keys.clone());
        }
        if let Some(projection) = &self.projection {
            query = query.select(projection.clone());
        }
        if let Some(window) = &self.pagination {
            query = query.skip(window.skip).limit(window.limit as i64);
        }
        query
    }

    /// 仅携带过滤+搜索谓词的句柄，供计数使用
    pub fn count_query(&self) -> CollectionQuery {
        let mut query = self.handle.clone();
        if let Some(portion) = self.filter_portion() {
            query = query.find(portion);
        }
        query
    }

    /// 过滤与搜索谓词的交集；两者皆空时为 None
    pub fn filter_portion(&self) -> Option<FilterExpression> {
        match (self.filter.clone(), self.search.clone()) {
            (Some(filter), Some(search)) => Some(filter.and(search)),
            (Some(filter), None) => Some(filter),
            (None, Some(search)) => Some(search),
            (None, None) => None,
        }
    }

    /// 记录的分页状态；未调用 paginate() 时返回默认窗口
    pub fn pagination(&self) -> PaginationState {
        self.pagination
            .unwrap_or_else(|| PaginationState::new(1, self.config.default_limit))
    }

    /// 执行窗口取数
    pub async fn execute(&self) -> Result<Vec<Document>> {
        self.build().execute().await
    }
}

/// 单字段的原始累积：裸键等值与方括号比较分别收集
#[derive(Default)]
struct FieldAccumulator {
    equals: Vec<String>,
    comparisons: Vec<(String, String)>,
}

impl FieldAccumulator {
    /// 归并为字段谓词；比较优先于等值，同名多值退化为成员谓词
    fn into_predicate(self) -> Option<FieldPredicate> {
        if !self.comparisons.is_empty() {
            let comparisons = self
                .comparisons
                .into_iter()
                .map(|(token, value)| build_comparison(&token, &value))
                .collect();
            return Some(FieldPredicate::Cmp(comparisons));
        }
        match self.equals.len() {
            0 => None,
            1 => Some(FieldPredicate::Eq(FilterValue::parse(&self.equals[0]))),
            _ => Some(FieldPredicate::Cmp(vec![Comparison::In(
                self.equals.iter().map(|v| FilterValue::parse(v)).collect(),
            )])),
        }
    }
}

fn build_comparison(token: &str, value: &str) -> Comparison {
    match token {
        "gte" => Comparison::Gte(FilterValue::parse(value)),
        "gt" => Comparison::Gt(FilterValue::parse(value)),
        "lte" => Comparison::Lte(FilterValue::parse(value)),
        "lt" => Comparison::Lt(FilterValue::parse(value)),
        "ne" => Comparison::Ne(FilterValue::parse(value)),
        "in" => Comparison::In(split_membership_list(value)),
        "nin" => Comparison::Nin(split_membership_list(value)),
        other => Comparison::Other(other.to_string(), FilterValue::parse(value)),
    }
}

/// 成员列表按逗号拆分，空项剔除
fn split_membership_list(value: &str) -> Vec<FilterValue> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(FilterValue::parse)
        .collect()
}

/// 解析正整数；解析失败或非正数返回 None
fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n >= 1)
}
