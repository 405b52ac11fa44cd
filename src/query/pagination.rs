//! 分页元数据模块
//!
//! 计数与取数是两次相互独立的集合往返，这里并发发起、
//! 双向汇合后装配元数据。两次往返之间不保证事务一致：
//! 并发写入下 total 可能相对结果集滞后（已知限制）

use anyhow::Result;
use mongodb::bson::Document;
use serde::Serialize;

use crate::query::ListQuery;

/// 分页元数据，随结果数组一起嵌入 JSON 响应体
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationResult {
    /// 由总数与分页窗口推导元数据
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        let pages = total.div_ceil(limit.max(1));
        Self {
            total,
            page,
            limit,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }
}

/// 并发执行窗口取数与谓词计数，返回结果窗口与分页元数据
///
/// 计数只使用过滤+搜索谓词，永不包含分页窗口，
/// 因此 total 对 page/limit 取值不敏感
pub async fn paginate_response(query: &ListQuery) -> Result<(Vec<Document>, PaginationResult)> {
    let windowed = query.build();
    let counting = query.count_query();

    let (documents, total) = tokio::join!(windowed.execute(), counting.count());
    let documents = documents?;
    let total = total?;

    let window = query.pagination();
    Ok((
        documents,
        PaginationResult::new(total, window.page, window.limit),
    ))
}
