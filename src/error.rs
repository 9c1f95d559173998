//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 错误类型定义
//!
//! 使用thiserror定义所有错误类型。

use thiserror::Error;

/// Cacheron 错误类型
#[derive(Error, Debug)]
pub enum CacheError {
    /// 配置错误（缺失策略等，唯一向调用方传播的错误）
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 存储层错误
    #[error("存储层错误: {0}")]
    TierError(#[from] TierError),

    /// 订阅回调错误
    #[error("订阅回调错误: {0}")]
    CallbackError(String),

    /// IO错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// YAML解析错误
    #[error("YAML解析错误: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// 层存储错误
///
/// Remote/Persistent 层协作者调用失败时产生，对 get/set 均不致命：
/// 读取退化为该层未命中，写入只记录日志。
#[derive(Error, Debug, Clone)]
pub enum TierError {
    /// 连接错误
    #[error("连接错误: {0}")]
    ConnectionError(String),

    /// 查询错误
    #[error("查询错误: {0}")]
    QueryError(String),

    /// 超时错误
    #[error("超时错误: {0}")]
    TimeoutError(String),

    /// 未找到
    #[error("未找到: {0}")]
    NotFound(String),
}

/// 完整性审计中单条不匹配记录
#[derive(Debug, Clone, serde::Serialize)]
pub struct IntegrityViolation {
    pub key: String,
    pub expected: String,
    pub actual: String,
}

/// 完整性审计报告
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IntegrityReport {
    /// 已检查条目数
    pub checked: usize,
    /// 不匹配的条目
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}
