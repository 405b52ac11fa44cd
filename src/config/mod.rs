//! Sift Core 配置模块
//!
//! 提供应用程序配置的加载与解析，包括：
//! - 查询默认值（默认页大小、搜索字段、时间戳/修订字段名）
//! - 日志配置
//! - MongoDB 实例配置

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<SiftConfig> = OnceLock::new();

/// 查询层默认值配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// 默认页大小
    pub default_limit: u64,
    /// 页大小上限；缺省不设上限，调用方按需开启
    pub max_limit: Option<u64>,
    /// 搜索阶段的默认字段列表
    pub search_fields: Vec<String>,
    /// 创建时间戳字段名（缺省排序键）
    pub created_field: String,
    /// 内部修订字段名（缺省投影排除项）
    pub revision_field: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: None,
            search_fields: vec!["name".to_string(), "email".to_string()],
            created_field: "created_at".to_string(),
            revision_field: "_rev".to_string(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 是否输出 target
    pub with_target: bool,
    /// 是否输出线程 ID
    pub with_thread_ids: bool,
    /// 是否输出文件名
    pub with_file: bool,
    /// 是否输出行号
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

/// MongoDB 实例配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MongoInstanceConfig {
    /// MongoDB 连接 URL
    pub url: String,
    /// 数据库名称
    #[serde(default)]
    pub database: Option<String>,
    /// 集合名称
    #[serde(default)]
    pub collection: Option<String>,
}

/// Sift 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiftConfig {
    /// 查询默认值
    #[serde(default)]
    pub query: QueryConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// MongoDB 配置（可选，未配置时 Mongo 后端不装配）
    #[serde(default)]
    pub mongodb: Option<MongoInstanceConfig>,
}

/// 加载配置并缓存为全局实例
///
/// `path` 为 None 时尝试 `config.toml`；文件缺失或解析失败时
/// 告警并回落到默认配置，不向调用方抛错
pub fn load_config(path: Option<&str>) -> &'static SiftConfig {
    APP_CONFIG.get_or_init(|| {
        let path = path.unwrap_or("config.toml");
        match load_config_from_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("无法加载配置文件 {path}，使用默认配置: {err:#}");
                SiftConfig::default()
            }
        }
    })
}

/// 获取全局配置实例；首次访问且未显式加载时使用默认配置
pub fn app_config() -> &'static SiftConfig {
    APP_CONFIG.get_or_init(SiftConfig::default)
}

fn load_config_from_file(path: &Path) -> Result<SiftConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let cfg: SiftConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}
