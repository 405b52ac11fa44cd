//! Sift Core 列表查询与分页核心库
//!
//! 把 HTTP 查询字符串翻译为对抽象文档集合的类型化查询：
//! 过滤 → 搜索 → 排序 → 投影 → 分页，并提供并发的
//! 计数 + 取数分页响应装配

pub mod collection;
pub mod config;
pub mod error;
pub mod params;
pub mod query;
pub mod tracing;
pub mod utils;

pub use collection::{CollectionQuery, DocumentCollection, MemoryCollection, MongoDocumentCollection};
pub use config::{
    LoggingConfig, MongoInstanceConfig, QueryConfig, SiftConfig, app_config, load_config,
};
pub use error::{ErrorCategory, SiftError};
pub use params::{QueryParams, RESERVED_KEYS, split_bracket_key};
pub use query::{
    Comparison, FieldPredicate, FilterExpression, FilterValue, ListQuery, PaginationResult,
    PaginationState, ProjectionSpec, QueryPlan, SortKey, paginate_response,
};
pub use utils::current_millis;
