//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 失效总线
//!
//! 四类失效入口（显式、模式、依赖、跨链）统一在此登记订阅者并
//! 扇出事件。回调在注册锁之外调用：慢或失败的订阅者不会阻塞
//! 其他订阅者，也不会阻塞后续的subscribe/unsubscribe调用。

use crate::entry::CacheCategory;
use crate::error::CacheError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 失效原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// 显式删除
    Explicit,
    /// 模式匹配失效
    Pattern,
    /// 依赖传导失效
    Dependency,
    /// 跨链同步失效
    CrossChain,
    /// TTL到期移除（惰性或主动清理）
    Expired,
    /// 容量淘汰移除
    Evicted,
    /// 全量清空
    Cleared,
}

/// 失效事件（瞬态，不持久化）
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationEvent {
    /// 事件覆盖的分类（None表示跨分类事件）
    pub category: Option<CacheCategory>,
    /// 键或模式片段
    pub pattern_or_key: String,
    /// 失效原因
    pub reason: InvalidationReason,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
}

impl InvalidationEvent {
    pub fn new(
        category: Option<CacheCategory>,
        pattern_or_key: impl Into<String>,
        reason: InvalidationReason,
    ) -> Self {
        Self {
            category,
            pattern_or_key: pattern_or_key.into(),
            reason,
            timestamp: Utc::now(),
        }
    }
}

/// 缓存依赖边（单跳，不传递）
///
/// 失效source_key时一并失效dependent_keys中的每个键，但不再
/// 级联到依赖这些键的键。边不会被自动修剪。
#[derive(Debug, Clone, Serialize)]
pub struct CacheDependency {
    pub source_key: String,
    pub dependent_keys: HashSet<String>,
    pub dependency_type: String,
    /// 显式分类（推荐路径）；None时回退键名约定推断
    pub category: Option<CacheCategory>,
    pub last_updated: DateTime<Utc>,
}

/// 订阅回调
///
/// 返回Err表示处理失败；错误被记录日志后丢弃，不重试、不传播。
pub type InvalidationCallback =
    Arc<dyn Fn(&InvalidationEvent) -> Result<(), CacheError> + Send + Sync>;

struct Subscription {
    id: Uuid,
    /// None表示订阅所有分类
    category: Option<CacheCategory>,
    callback: InvalidationCallback,
}

/// 失效总线
pub struct InvalidationBus {
    subscriptions: RwLock<Vec<Subscription>>,
    dependencies: DashMap<String, CacheDependency>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            dependencies: DashMap::new(),
        }
    }

    /// 注册订阅者，返回订阅id
    ///
    /// `category` 为None时接收所有分类的事件。
    pub fn subscribe(
        &self,
        callback: InvalidationCallback,
        category: Option<CacheCategory>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.subscriptions.write().push(Subscription {
            id,
            category,
            callback,
        });
        debug!("注册失效订阅者: id={} category={:?}", id, category);
        id
    }

    /// 注销订阅者，返回是否存在
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);
        subscriptions.len() < before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// 向匹配订阅者扇出事件
    ///
    /// 回调快照在锁外逐个调用（至少一次语义）；失败只记日志。
    pub fn publish(&self, event: &InvalidationEvent) {
        let callbacks: Vec<(Uuid, InvalidationCallback)> = {
            let subscriptions = self.subscriptions.read();
            subscriptions
                .iter()
                .filter(|sub| match (sub.category, event.category) {
                    (None, _) => true,
                    (Some(subscribed), Some(actual)) => subscribed == actual,
                    // 跨分类事件投递给所有订阅者
                    (Some(_), None) => true,
                })
                .map(|sub| (sub.id, Arc::clone(&sub.callback)))
                .collect()
        };

        for (id, callback) in callbacks {
            if let Err(e) = callback(event) {
                warn!("失效订阅回调失败: id={} error={}", id, e);
            }
        }
    }

    /// 登记依赖边（覆盖同source_key的旧边）
    pub fn register_dependency(
        &self,
        source_key: impl Into<String>,
        dependent_keys: impl IntoIterator<Item = String>,
        dependency_type: impl Into<String>,
        category: Option<CacheCategory>,
    ) {
        let source_key = source_key.into();
        let dependency = CacheDependency {
            source_key: source_key.clone(),
            dependent_keys: dependent_keys.into_iter().collect(),
            dependency_type: dependency_type.into(),
            category,
            last_updated: Utc::now(),
        };
        self.dependencies.insert(source_key, dependency);
    }

    /// 查找source_key的依赖边
    pub fn dependency_of(&self, source_key: &str) -> Option<CacheDependency> {
        self.dependencies.get(source_key).map(|d| d.clone())
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// 清空依赖图（clear_all时调用）
    pub fn clear_dependencies(&self) {
        self.dependencies.clear();
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 构造跨链失效的模式片段
///
/// 固定片段集：`balance_{wallet}_{chain}`、
/// `cross_chain_{wallet}_{chain_from}[_{chain_to}]`、
/// `tx_history_{wallet}_{chain}`。省略chain_to时目标为该钱包的
/// 所有链（模式退化为不带链后缀的前缀片段）。
pub fn cross_chain_patterns(
    wallet: &str,
    chain_from: &str,
    chain_to: Option<&str>,
) -> Vec<(String, CacheCategory)> {
    match chain_to {
        Some(chain_to) => vec![
            (
                format!("balance_{}_{}", wallet, chain_from),
                CacheCategory::Balance,
            ),
            (
                format!("balance_{}_{}", wallet, chain_to),
                CacheCategory::Balance,
            ),
            (
                format!("cross_chain_{}_{}_{}", wallet, chain_from, chain_to),
                CacheCategory::CrossChainBalance,
            ),
            (
                format!("tx_history_{}_{}", wallet, chain_from),
                CacheCategory::TxHistory,
            ),
            (
                format!("tx_history_{}_{}", wallet, chain_to),
                CacheCategory::TxHistory,
            ),
        ],
        None => vec![
            (format!("balance_{}_", wallet), CacheCategory::Balance),
            (
                format!("cross_chain_{}_{}", wallet, chain_from),
                CacheCategory::CrossChainBalance,
            ),
            (format!("tx_history_{}_", wallet), CacheCategory::TxHistory),
        ],
    }
}
