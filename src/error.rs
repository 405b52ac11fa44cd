//! Sift Core 错误工具模块
//!
//! 查询构建器自身不产生错误（非法输入一律退化为默认值）；
//! 这里提供的是调用方把集合层失败翻译为用户可见错误时
//! 使用的统一分类

use thiserror::Error;

/// 错误类别，对应调用方响应层的粗粒度分支
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    NotFound,
    Internal,
}

/// 统一错误类型
#[derive(Debug, Error)]
pub enum SiftError {
    /// 请求侧错误（如存储层拒绝了畸形过滤条件）
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// 目标资源不存在
    #[error("not found: {message}")]
    NotFound { message: String },

    /// 基础设施错误，保留原始错误链
    #[error("internal error: {source}")]
    Internal {
        #[from]
        source: anyhow::Error,
    },
}

impl SiftError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BadRequest { .. } => ErrorCategory::BadRequest,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// HTTP 语义下的状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    /// 可预期的业务错误为 true，基础设施故障为 false
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }
}
