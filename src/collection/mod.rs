//! 文档集合抽象模块
//!
//! `DocumentCollection` 是存储后端需要实现的最小接口；
//! `CollectionQuery` 是在其上的可链式细化句柄，每一步
//! 返回新句柄而非就地修改，终结操作才触发 I/O。
//! 任何存储引擎（文档型、关系型、内存）都可以接入

pub mod memory;
pub mod mongo;

pub use memory::MemoryCollection;
pub use mongo::MongoDocumentCollection;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::Document;

use crate::query::{FilterExpression, ProjectionSpec, QueryPlan, SortKey};

/// 存储后端接口（需要作为 trait 对象使用，保留 async-trait）
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// 按执行计划取回文档窗口
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Document>>;

    /// 只按过滤谓词计数，忽略排序/投影/分页窗口
    async fn count(&self, filter: Option<&FilterExpression>) -> Result<u64>;
}

/// 可链式细化的集合查询句柄
///
/// 持有后端引用与累积的执行计划；`find`/`sort`/`select`/
/// `skip`/`limit` 均消费自身返回细化后的新句柄，
/// `execute`/`count` 为异步终结操作
#[derive(Clone)]
pub struct CollectionQuery {
    backend: Arc<dyn DocumentCollection>,
    plan: QueryPlan,
}

impl CollectionQuery {
    pub fn new(backend: Arc<dyn DocumentCollection>) -> Self {
        Self {
            backend,
            plan: QueryPlan::default(),
        }
    }

    /// 叠加过滤谓词，与既有谓词取合取
    pub fn find(mut self, filter: FilterExpression) -> Self {
        self.plan.filter = Some(match self.plan.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// 设置排序键列表，后设者覆盖前设者
    pub fn sort(mut self, keys: Vec<SortKey>) -> Self {
        self.plan.sort = keys;
        self
    }

    /// 设置投影，后设者覆盖前设者
    pub fn select(mut self, projection: ProjectionSpec) -> Self {
        self.plan.projection = Some(projection);
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.plan.skip = Some(n);
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.plan.limit = Some(n);
        self
    }

    /// 当前累积的执行计划
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// 执行窗口取数
    pub async fn execute(&self) -> Result<Vec<Document>> {
        self.backend.fetch(&self.plan).await
    }

    /// 对过滤谓词计数（不含分页窗口）
    pub async fn count(&self) -> Result<u64> {
        self.backend.count(self.plan.filter.as_ref()).await
    }
}
