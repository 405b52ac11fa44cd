//! MongoDB 集合后端
//!
//! 将类型化查询模型翻译为 BSON 过滤/排序/投影文档，
//! 经官方驱动执行。翻译全部由结构直接构造，
//! 搜索词先做正则转义，保证子串语义

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection};

use super::DocumentCollection;
use crate::config::SiftConfig;
use crate::query::{
    Comparison, FieldPredicate, FilterExpression, FilterValue, ProjectionSpec, QueryPlan, SortKey,
};

/// MongoDB 文档集合后端
pub struct MongoDocumentCollection {
    collection: Collection<Document>,
    _client: Option<Arc<Client>>,
}

impl MongoDocumentCollection {
    /// 按配置装配；`[mongodb]` 段缺失时返回 None
    pub async fn connect(config: &SiftConfig) -> Result<Option<Self>> {
        let mongo = match &config.mongodb {
            Some(mongo) => mongo,
            None => return Ok(None),
        };

        let options = ClientOptions::parse(&mongo.url)
            .await
            .context("Failed to parse MongoDB connection url")?;
        let client = Arc::new(Client::with_options(options)?);
        let database = client.database(mongo.database.as_deref().unwrap_or("sift"));
        let collection =
            database.collection::<Document>(mongo.collection.as_deref().unwrap_or("documents"));

        Ok(Some(Self {
            collection,
            _client: Some(client),
        }))
    }

    /// 复用调用方既有的集合句柄
    pub fn from_collection(collection: Collection<Document>) -> Self {
        Self {
            collection,
            _client: None,
        }
    }
}

#[async_trait]
impl DocumentCollection for MongoDocumentCollection {
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Document>> {
        let filter = plan.filter.as_ref().map(filter_to_document);
        let options = FindOptions::builder()
            .sort((!plan.sort.is_empty()).then(|| sort_to_document(&plan.sort)))
            .projection(plan.projection.as_ref().map(projection_to_document))
            .skip(plan.skip)
            .limit(plan.limit)
            .build();

        let cursor = self
            .collection
            .find(filter, options)
            .await
            .context("Failed to execute find")?;
        let documents = cursor
            .try_collect()
            .await
            .context("Failed to drain find cursor")?;
        Ok(documents)
    }

    async fn count(&self, filter: Option<&FilterExpression>) -> Result<u64> {
        let filter = filter.map(filter_to_document);
        let total = self
            .collection
            .count_documents(filter, None::<mongodb::options::CountOptions>)
            .await
            .context("Failed to count documents")?;
        Ok(total)
    }
}

/// 过滤表达式 → BSON 过滤文档
pub(crate) fn filter_to_document(expr: &FilterExpression) -> Document {
    match expr {
        FilterExpression::Fields(fields) => {
            let mut document = Document::new();
            for (field, predicate) in fields {
                document.insert(field.clone(), predicate_to_bson(predicate));
            }
            document
        }
        FilterExpression::And(parts) => {
            let branches: Vec<Document> = parts.iter().map(filter_to_document).collect();
            doc! {"$and": branches}
        }
        FilterExpression::Or(parts) => {
            let branches: Vec<Document> = parts.iter().map(filter_to_document).collect();
            doc! {"$or": branches}
        }
        FilterExpression::Contains { field, needle } => {
            let mut document = Document::new();
            document.insert(
                field.clone(),
                doc! {"$regex": escape_regex(needle), "$options": "i"},
            );
            document
        }
    }
}

fn predicate_to_bson(predicate: &FieldPredicate) -> Bson {
    match predicate {
        FieldPredicate::Eq(value) => value_to_bson(value),
        FieldPredicate::Cmp(comparisons) => {
            let mut constraints = Document::new();
            for comparison in comparisons {
                match comparison {
                    Comparison::Gte(v) => constraints.insert("$gte", value_to_bson(v)),
                    Comparison::Gt(v) => constraints.insert("$gt", value_to_bson(v)),
                    Comparison::Lte(v) => constraints.insert("$lte", value_to_bson(v)),
                    Comparison::Lt(v) => constraints.insert("$lt", value_to_bson(v)),
                    Comparison::Ne(v) => constraints.insert("$ne", value_to_bson(v)),
                    Comparison::In(list) => constraints.insert("$in", values_to_array(list)),
                    Comparison::Nin(list) => constraints.insert("$nin", values_to_array(list)),
                    // 未识别算子原样下传，由服务端拒绝或忽略
                    Comparison::Other(token, v) => {
                        constraints.insert(format!("${token}"), value_to_bson(v))
                    }
                };
            }
            Bson::Document(constraints)
        }
    }
}

fn value_to_bson(value: &FilterValue) -> Bson {
    match value {
        FilterValue::Bool(b) => Bson::Boolean(*b),
        FilterValue::Int(n) => Bson::Int64(*n),
        FilterValue::Float(f) => Bson::Double(*f),
        FilterValue::Text(s) => Bson::String(s.clone()),
    }
}

fn values_to_array(values: &[FilterValue]) -> Bson {
    Bson::Array(values.iter().map(value_to_bson).collect())
}

/// 排序键列表 → BSON 排序文档（1 升序 / -1 降序）
pub(crate) fn sort_to_document(keys: &[SortKey]) -> Document {
    let mut document = Document::new();
    for key in keys {
        document.insert(key.field.clone(), if key.ascending { 1i32 } else { -1i32 });
    }
    document
}

/// 投影规格 → BSON 投影文档
///
/// 白名单逐字段置 1（`_id` 由服务端恒定返回）；
/// 黑名单逐字段置 0
pub(crate) fn projection_to_document(projection: &ProjectionSpec) -> Document {
    let mut document = Document::new();
    match projection {
        ProjectionSpec::Include(fields) => {
            for field in fields {
                document.insert(field.clone(), 1i32);
            }
        }
        ProjectionSpec::Exclude(fields) => {
            for field in fields {
                document.insert(field.clone(), 0i32);
            }
        }
    }
    document
}

/// 转义正则元字符，使搜索词按字面子串匹配
fn escape_regex(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
