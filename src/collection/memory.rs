//! 内存集合后端
//!
//! 以 `RwLock<Vec<Document>>` 模拟外部文档存储，直接对
//! 类型化查询模型求值。作为测试替身使用，同时给出
//! 过滤/排序/投影/窗口语义的参考实现

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use tokio::sync::RwLock;

use super::DocumentCollection;
use crate::query::{
    Comparison, FieldPredicate, FilterExpression, FilterValue, ProjectionSpec, QueryPlan,
};

/// 内存文档集合
pub struct MemoryCollection {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// 预置文档集合
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    pub async fn insert(&self, document: Document) {
        let mut guard = self.documents.write().await;
        guard.push(document);
    }

    pub async fn insert_many(&self, documents: Vec<Document>) {
        let mut guard = self.documents.write().await;
        guard.extend(documents);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Document>> {
        let guard = self.documents.read().await;
        let mut matched: Vec<&Document> = guard
            .iter()
            .filter(|doc| matches_filter(doc, plan.filter.as_ref()))
            .collect();

        if !plan.sort.is_empty() {
            // sort_by 是稳定排序，多键次序由键列表自身保证
            matched.sort_by(|a, b| compare_documents(a, b, plan));
        }

        let skip = plan.skip.unwrap_or(0) as usize;
        let windowed = matched.into_iter().skip(skip);
        let documents: Vec<Document> = match plan.limit {
            Some(limit) if limit > 0 => windowed
                .take(limit as usize)
                .map(|doc| apply_projection(doc, plan.projection.as_ref()))
                .collect(),
            _ => windowed
                .map(|doc| apply_projection(doc, plan.projection.as_ref()))
                .collect(),
        };
        Ok(documents)
    }

    async fn count(&self, filter: Option<&FilterExpression>) -> Result<u64> {
        let guard = self.documents.read().await;
        let total = guard
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .count();
        Ok(total as u64)
    }
}

fn matches_filter(doc: &Document, filter: Option<&FilterExpression>) -> bool {
    match filter {
        None => true,
        Some(expr) => eval_expression(doc, expr),
    }
}

fn eval_expression(doc: &Document, expr: &FilterExpression) -> bool {
    match expr {
        FilterExpression::Fields(fields) => fields
            .iter()
            .all(|(field, predicate)| eval_predicate(doc, field, predicate)),
        FilterExpression::And(parts) => parts.iter().all(|part| eval_expression(doc, part)),
        FilterExpression::Or(parts) => parts.iter().any(|part| eval_expression(doc, part)),
        FilterExpression::Contains { field, needle } => match doc.get(field) {
            Some(Bson::String(value)) => value.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        },
    }
}

fn eval_predicate(doc: &Document, field: &str, predicate: &FieldPredicate) -> bool {
    match predicate {
        FieldPredicate::Eq(value) => doc
            .get(field)
            .map(|bson| bson_equals(bson, value))
            .unwrap_or(false),
        FieldPredicate::Cmp(comparisons) => comparisons
            .iter()
            .all(|comparison| eval_comparison(doc.get(field), comparison)),
    }
}

fn eval_comparison(value: Option<&Bson>, comparison: &Comparison) -> bool {
    match comparison {
        Comparison::Gte(target) => {
            ordering_against(value, target).is_some_and(|o| o != Ordering::Less)
        }
        Comparison::Gt(target) => {
            ordering_against(value, target).is_some_and(|o| o == Ordering::Greater)
        }
        Comparison::Lte(target) => {
            ordering_against(value, target).is_some_and(|o| o != Ordering::Greater)
        }
        Comparison::Lt(target) => {
            ordering_against(value, target).is_some_and(|o| o == Ordering::Less)
        }
        // 缺失字段视为不等/不在集合内，与文档存储的语义一致
        Comparison::Ne(target) => match value {
            None => true,
            Some(bson) => !bson_equals(bson, target),
        },
        Comparison::In(list) => {
            value.is_some_and(|bson| list.iter().any(|item| bson_equals(bson, item)))
        }
        Comparison::Nin(list) => {
            !value.is_some_and(|bson| list.iter().any(|item| bson_equals(bson, item)))
        }
        // 未识别算子在内存后端不加约束
        Comparison::Other(_, _) => true,
    }
}

/// 文档值与过滤值的序关系；类型不可比时返回 None
fn ordering_against(value: Option<&Bson>, target: &FilterValue) -> Option<Ordering> {
    let value = value?;
    match target {
        FilterValue::Int(n) => bson_number(value)?.partial_cmp(&(*n as f64)),
        FilterValue::Float(f) => bson_number(value)?.partial_cmp(f),
        FilterValue::Text(s) => match value {
            Bson::String(text) => Some(text.as_str().cmp(s.as_str())),
            _ => None,
        },
        // 布尔只参与等值比较
        FilterValue::Bool(_) => None,
    }
}

fn bson_equals(value: &Bson, target: &FilterValue) -> bool {
    match target {
        FilterValue::Bool(b) => matches!(value, Bson::Boolean(x) if x == b),
        FilterValue::Int(n) => bson_number(value) == Some(*n as f64),
        FilterValue::Float(f) => bson_number(value) == Some(*f),
        FilterValue::Text(s) => matches!(value, Bson::String(x) if x == s),
    }
}

/// 数值族统一按 f64 比较；时间戳按毫秒参与数值比较
fn bson_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(f) => Some(*f),
        Bson::DateTime(dt) => Some(dt.timestamp_millis() as f64),
        _ => None,
    }
}

fn compare_documents(a: &Document, b: &Document, plan: &QueryPlan) -> Ordering {
    for key in &plan.sort {
        let ordering = compare_bson_values(a.get(&key.field), b.get(&key.field));
        if ordering != Ordering::Equal {
            return if key.ascending {
                ordering
            } else {
                ordering.reverse()
            };
        }
    }
    Ordering::Equal
}

/// 跨类型全序：缺失/Null < 数值族 < 字符串 < 布尔 < 其他
fn compare_bson_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Some(x), Some(y)) => match rank_a {
            1 => bson_number(x)
                .zip(bson_number(y))
                .and_then(|(m, n)| m.partial_cmp(&n))
                .unwrap_or(Ordering::Equal),
            2 => match (x, y) {
                (Bson::String(m), Bson::String(n)) => m.cmp(n),
                _ => Ordering::Equal,
            },
            3 => match (x, y) {
                (Bson::Boolean(m), Bson::Boolean(n)) => m.cmp(n),
                _ => Ordering::Equal,
            },
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 0,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::DateTime(_)) => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Boolean(_)) => 3,
        _ => 4,
    }
}

fn apply_projection(doc: &Document, projection: Option<&ProjectionSpec>) -> Document {
    match projection {
        None => doc.clone(),
        Some(ProjectionSpec::Include(fields)) => {
            let mut projected = Document::new();
            // 标识字段恒定返回
            if let Some(id) = doc.get("_id") {
                projected.insert("_id", id.clone());
            }
            for field in fields {
                if field == "_id" {
                    continue;
                }
                if let Some(value) = doc.get(field) {
                    projected.insert(field.clone(), value.clone());
                }
            }
            projected
        }
        Some(ProjectionSpec::Exclude(fields)) => {
            let mut projected = doc.clone();
            for field in fields {
                projected.remove(field);
            }
            projected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortKey;
    use mongodb::bson::doc;
    use std::collections::BTreeMap;

    fn sample() -> MemoryCollection {
        MemoryCollection::with_documents(vec![
            doc! {"_id": "u1", "name": "An", "age": 20, "is_active": true, "created_at": 100i64, "_rev": 1},
            doc! {"_id": "u2", "name": "Binh", "age": 25, "is_active": false, "created_at": 200i64, "_rev": 1},
            doc! {"_id": "u3", "name": "Chi", "age": 30, "is_active": true, "created_at": 300i64, "_rev": 2},
        ])
    }

    fn field_filter(field: &str, predicate: FieldPredicate) -> FilterExpression {
        let mut map = BTreeMap::new();
        map.insert(field.to_string(), predicate);
        FilterExpression::Fields(map)
    }

    #[tokio::test]
    async fn test_equality_filter() {
        let collection = sample();
        let plan = QueryPlan {
            filter: Some(field_filter(
                "is_active",
                FieldPredicate::Eq(FilterValue::Bool(true)),
            )),
            ..Default::default()
        };
        let docs = collection.fetch(&plan).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_range_filter_conjunction() {
        let collection = sample();
        let plan = QueryPlan {
            filter: Some(field_filter(
                "age",
                FieldPredicate::Cmp(vec![
                    Comparison::Gte(FilterValue::Int(20)),
                    Comparison::Lt(FilterValue::Int(30)),
                ]),
            )),
            ..Default::default()
        };
        let docs = collection.fetch(&plan).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_ne_matches_missing_field() {
        let collection = MemoryCollection::with_documents(vec![
            doc! {"_id": "a", "role": "admin"},
            doc! {"_id": "b"},
        ]);
        let plan = QueryPlan {
            filter: Some(field_filter(
                "role",
                FieldPredicate::Cmp(vec![Comparison::Ne(FilterValue::Text(
                    "admin".to_string(),
                ))]),
            )),
            ..Default::default()
        };
        let docs = collection.fetch(&plan).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_str("_id").unwrap(), "b");
    }

    #[tokio::test]
    async fn test_membership_filters() {
        let collection = sample();
        let in_plan = QueryPlan {
            filter: Some(field_filter(
                "name",
                FieldPredicate::Cmp(vec![Comparison::In(vec![
                    FilterValue::Text("An".to_string()),
                    FilterValue::Text("Chi".to_string()),
                ])]),
            )),
            ..Default::default()
        };
        assert_eq!(collection.fetch(&in_plan).await.unwrap().len(), 2);

        let nin_plan = QueryPlan {
            filter: Some(field_filter(
                "name",
                FieldPredicate::Cmp(vec![Comparison::Nin(vec![FilterValue::Text(
                    "An".to_string(),
                )])]),
            )),
            ..Default::default()
        };
        assert_eq!(collection.fetch(&nin_plan).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_operator_adds_no_constraint() {
        let collection = sample();
        let plan = QueryPlan {
            filter: Some(field_filter(
                "age",
                FieldPredicate::Cmp(vec![Comparison::Other(
                    "exists".to_string(),
                    FilterValue::Bool(true),
                )]),
            )),
            ..Default::default()
        };
        assert_eq!(collection.fetch(&plan).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_contains_is_case_insensitive() {
        let collection = sample();
        let plan = QueryPlan {
            filter: Some(FilterExpression::Contains {
                field: "name".to_string(),
                needle: "BI".to_string(),
            }),
            ..Default::default()
        };
        let docs = collection.fetch(&plan).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_str("name").unwrap(), "Binh");
    }

    #[tokio::test]
    async fn test_multi_key_sort() {
        let collection = MemoryCollection::with_documents(vec![
            doc! {"_id": "a", "age": 30, "name": "Chi"},
            doc! {"_id": "b", "age": 30, "name": "An"},
            doc! {"_id": "c", "age": 20, "name": "Binh"},
        ]);
        let plan = QueryPlan {
            sort: vec![SortKey::desc("age"), SortKey::asc("name")],
            ..Default::default()
        };
        let docs = collection.fetch(&plan).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.get_str("_id").unwrap()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_window_applies_after_sort() {
        let collection = sample();
        let plan = QueryPlan {
            sort: vec![SortKey::desc("created_at")],
            skip: Some(1),
            limit: Some(1),
            ..Default::default()
        };
        let docs = collection.fetch(&plan).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_str("_id").unwrap(), "u2");
    }

    #[tokio::test]
    async fn test_include_projection_keeps_identity() {
        let collection = sample();
        let plan = QueryPlan {
            projection: Some(ProjectionSpec::Include(vec!["name".to_string()])),
            limit: Some(1),
            ..Default::default()
        };
        let docs = collection.fetch(&plan).await.unwrap();
        let doc = &docs[0];
        assert!(doc.get("_id").is_some());
        assert!(doc.get("name").is_some());
        assert!(doc.get("age").is_none());
        assert!(doc.get("_rev").is_none());
    }

    #[tokio::test]
    async fn test_exclude_projection_drops_revision_only() {
        let collection = sample();
        let plan = QueryPlan {
            projection: Some(ProjectionSpec::Exclude(vec!["_rev".to_string()])),
            limit: Some(1),
            ..Default::default()
        };
        let docs = collection.fetch(&plan).await.unwrap();
        let doc = &docs[0];
        assert!(doc.get("_rev").is_none());
        assert!(doc.get("name").is_some());
        assert!(doc.get("age").is_some());
    }

    #[tokio::test]
    async fn test_count_ignores_window() {
        let collection = sample();
        let filter = field_filter("is_active", FieldPredicate::Eq(FilterValue::Bool(true)));
        let total = collection.count(Some(&filter)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(collection.count(None).await.unwrap(), 3);
    }
}
