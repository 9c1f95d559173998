//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 分层缓存门面
//!
//! 组合Fast层存储、Remote/Persistent协作者、策略注册表、淘汰引擎、
//! 自适应容量、失效总线与预热协调器。读取按 Fast -> Remote ->
//! Persistent 级联并向上提升命中；写入按分类策略写穿各层。
//!
//! # 一致性取舍
//!
//! Fast层是本进程读己之写的权威；Remote/Persistent是跨进程共享的
//! 尽力而为副本——非Fast层写入失败只记日志，不使set失败。协作者
//! 的任何错误视为该层未命中，绝不向上抛出。

use crate::adaptive::{AdaptiveSizer, SizeDirection};
use crate::constants::{
    ADAPTIVE_SHRINK_HIT_RATE, DEFAULT_MAINTENANCE_INTERVAL_SECS, DEFAULT_PREFETCH_WORKERS,
    EXPIRING_SOON_WINDOW_SECS,
};
use crate::entry::{CacheCategory, CacheEntry, CacheTier, CacheValue};
use crate::entry_store::{EntryStore, FastRead};
use crate::error::{CacheError, IntegrityReport, IntegrityViolation, TierError};
use crate::eviction::EvictionEngine;
use crate::invalidation::{
    cross_chain_patterns, InvalidationBus, InvalidationCallback, InvalidationEvent,
    InvalidationReason,
};
use crate::policy::{CachePolicy, PolicyRegistry};
use crate::prefetch::{FetchFn, PrefetchCoordinator, WarmOutcome};
use crate::stats::{DashboardSnapshot, StatsCollector, StatsSnapshot};
use crate::tier::{PersistentTierClient, RemoteTierClient};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// 单层健康状态
#[derive(Debug, Clone, Serialize)]
pub struct TierHealth {
    pub configured: bool,
    pub reachable: bool,
    pub entries: Option<usize>,
}

/// 健康检查报告
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub fast_entries: usize,
    pub remote: TierHealth,
    pub persistent: TierHealth,
}

impl HealthReport {
    /// 所有已配置层均可达
    pub fn healthy(&self) -> bool {
        (!self.remote.configured || self.remote.reachable)
            && (!self.persistent.configured || self.persistent.reachable)
    }
}

/// 单飞加载器
///
/// 同键并发加载收敛为一次实际加载，其余请求等待结果广播。
struct SingleFlightLoader {
    pending: DashMap<String, watch::Sender<Option<Result<Option<CacheValue>, TierError>>>>,
}

impl SingleFlightLoader {
    fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    async fn load<F, Fut>(
        &self,
        key: &str,
        loader: F,
    ) -> Result<Option<CacheValue>, TierError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Option<CacheValue>, TierError>>,
    {
        use dashmap::mapref::entry::Entry;

        let tx = match self.pending.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                // 已有请求在加载，等待其广播结果
                trace!("等待其他请求加载 key={}", key);
                let tx = entry.get();
                let mut rx = tx.subscribe();
                drop(entry);

                if let Some(res) = rx.borrow().clone() {
                    return res;
                }
                if rx.changed().await.is_ok() {
                    if let Some(res) = rx.borrow().clone() {
                        return res;
                    }
                }
                return Err(TierError::TimeoutError(
                    "加载方未广播结果即退出".to_string(),
                ));
            }
            Entry::Vacant(entry) => {
                let (tx, _) = watch::channel(None);
                entry.insert(tx.clone());
                tx
            }
        };

        let result = loader().await;
        let _ = tx.send(Some(result.clone()));
        self.pending.remove(key);
        result
    }
}

/// 分层缓存管理器构建器
pub struct TieredCacheManagerBuilder {
    policies: Option<Arc<PolicyRegistry>>,
    remote: Option<Arc<dyn RemoteTierClient>>,
    persistent: Option<Arc<dyn PersistentTierClient>>,
    prefetch_workers: usize,
    maintenance_interval: Option<Duration>,
}

impl TieredCacheManagerBuilder {
    pub fn new() -> Self {
        Self {
            policies: None,
            remote: None,
            persistent: None,
            prefetch_workers: DEFAULT_PREFETCH_WORKERS,
            maintenance_interval: None,
        }
    }

    pub fn policies(mut self, policies: Arc<PolicyRegistry>) -> Self {
        self.policies = Some(policies);
        self
    }

    pub fn remote_tier(mut self, remote: Arc<dyn RemoteTierClient>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn persistent_tier(mut self, persistent: Arc<dyn PersistentTierClient>) -> Self {
        self.persistent = Some(persistent);
        self
    }

    pub fn prefetch_workers(mut self, workers: usize) -> Self {
        self.prefetch_workers = workers;
        self
    }

    /// 启用后台巡检（主动过期清理 + 低命中率缩容）
    pub fn maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = Some(interval);
        self
    }

    pub fn default_maintenance(self) -> Self {
        self.maintenance_interval(Duration::from_secs(DEFAULT_MAINTENANCE_INTERVAL_SECS))
    }

    pub fn build(self) -> Arc<TieredCacheManager> {
        let policies = self
            .policies
            .unwrap_or_else(|| Arc::new(PolicyRegistry::with_defaults()));
        let store = Arc::new(EntryStore::new());
        let stats = Arc::new(StatsCollector::new());
        let sizer = {
            let policies = Arc::clone(&policies);
            Arc::new(AdaptiveSizer::new(move |category| {
                policies
                    .get(category)
                    .map(|p| p.max_entries)
                    .unwrap_or(crate::constants::DEFAULT_MAX_ENTRIES)
            }))
        };
        let eviction = EvictionEngine::new(Arc::clone(&store), Arc::clone(&sizer), Arc::clone(&stats));

        let manager = Arc::new(TieredCacheManager {
            store,
            remote: self.remote,
            persistent: self.persistent,
            policies,
            sizer,
            eviction,
            bus: Arc::new(InvalidationBus::new()),
            prefetch: PrefetchCoordinator::new(self.prefetch_workers),
            single_flight: SingleFlightLoader::new(),
            stats,
            category_locks: Default::default(),
            maintenance_handle: Mutex::new(None),
        });

        if let Some(interval) = self.maintenance_interval {
            let handle = TieredCacheManager::start_maintenance(Arc::downgrade(&manager), interval);
            *manager.maintenance_handle.lock() = Some(handle);
        }

        manager
    }
}

impl Default for TieredCacheManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 分层缓存管理器
pub struct TieredCacheManager {
    store: Arc<EntryStore>,
    remote: Option<Arc<dyn RemoteTierClient>>,
    persistent: Option<Arc<dyn PersistentTierClient>>,
    policies: Arc<PolicyRegistry>,
    sizer: Arc<AdaptiveSizer>,
    eviction: EvictionEngine,
    bus: Arc<InvalidationBus>,
    prefetch: PrefetchCoordinator,
    single_flight: SingleFlightLoader,
    stats: Arc<StatsCollector>,
    /// 分类级写入锁：容量压回与Fast层插入在锁内串行，锁不跨await。
    /// 锁序固定为 分类锁 -> 分段键锁，反向获取不存在。
    category_locks: [Mutex<()>; CacheCategory::ALL.len()],
    maintenance_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TieredCacheManager {
    pub fn builder() -> TieredCacheManagerBuilder {
        TieredCacheManagerBuilder::new()
    }

    /// 读取缓存值
    ///
    /// Fast -> Remote -> Persistent 级联；慢层命中后以分类TTL提升
    /// 写回Fast层。真未命中除统计外无副作用。
    pub async fn get(
        &self,
        key: &str,
        category: CacheCategory,
    ) -> Result<Option<CacheValue>, CacheError> {
        let policy = self.policies.get(category)?;

        match self.store.get(key) {
            FastRead::Hit(entry) => {
                trace!("Fast层命中: key={}", key);
                self.stats.record_hit(category, CacheTier::Fast);
                return Ok(Some(entry.value));
            }
            FastRead::Expired => {
                // 惰性过期，按缺失继续向慢层级联
                self.stats.record_expirations(1);
                self.bus.publish(&InvalidationEvent::new(
                    Some(category),
                    key,
                    InvalidationReason::Expired,
                ));
            }
            FastRead::Miss => {}
        }

        // Remote层：任何错误退化为该层未命中
        if policy.has_tier(CacheTier::Remote) {
            if let Some(remote) = &self.remote {
                match remote.get(key).await {
                    Ok(Some(bytes)) => match CacheValue::from_bytes(&bytes) {
                        Ok(value) => {
                            debug!("Remote层命中，提升到Fast层: key={}", key);
                            self.promote(key, value.clone(), category, &policy, CacheTier::Remote);
                            self.stats.record_hit(category, CacheTier::Remote);
                            return Ok(Some(value));
                        }
                        Err(e) => {
                            warn!("Remote层数据解码失败，视为未命中: key={} error={}", key, e);
                        }
                    },
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Remote层不可用，视为未命中: key={} error={}", key, e);
                    }
                }
            }
        }

        // Persistent层
        if policy.has_tier(CacheTier::Persistent) {
            if let Some(persistent) = &self.persistent {
                match persistent.get(key).await {
                    Ok(Some(bytes)) => match CacheValue::from_bytes(&bytes) {
                        Ok(value) => {
                            debug!("Persistent层命中，提升到Fast层: key={}", key);
                            self.promote(
                                key,
                                value.clone(),
                                category,
                                &policy,
                                CacheTier::Persistent,
                            );
                            // 同时回填Remote层（尽力而为）
                            if policy.has_tier(CacheTier::Remote) {
                                if let Some(remote) = &self.remote {
                                    if let Err(e) = remote.set(key, &bytes, Some(policy.ttl)).await
                                    {
                                        warn!("Remote层回填失败: key={} error={}", key, e);
                                    }
                                }
                            }
                            self.stats.record_hit(category, CacheTier::Persistent);
                            return Ok(Some(value));
                        }
                        Err(e) => {
                            warn!(
                                "Persistent层数据解码失败，视为未命中: key={} error={}",
                                key, e
                            );
                        }
                    },
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Persistent层不可用，视为未命中: key={} error={}", key, e);
                    }
                }
            }
        }

        self.stats.record_miss(category);
        Ok(None)
    }

    /// 分类级写入锁
    fn category_lock(&self, category: CacheCategory) -> parking_lot::MutexGuard<'_, ()> {
        self.category_locks[category.ordinal()].lock()
    }

    /// 按键发布容量淘汰事件（在释放分类锁之后调用）
    fn publish_evictions(&self, category: CacheCategory, keys: &[String]) {
        for key in keys {
            self.bus.publish(&InvalidationEvent::new(
                Some(category),
                key,
                InvalidationReason::Evicted,
            ));
        }
    }

    /// 慢层命中后的Fast层提升写回
    ///
    /// 提升同样受容量约束；条目记录其来源层。
    fn promote(
        &self,
        key: &str,
        value: CacheValue,
        category: CacheCategory,
        policy: &CachePolicy,
        source: CacheTier,
    ) {
        let evicted = {
            let _category_guard = self.category_lock(category);
            let evicted = self.eviction.ensure_capacity(category, policy.strategy, 1);
            let _guard = self.store.lock_key(key);
            let entry = CacheEntry::new(key, value, category, Some(policy.ttl)).with_tier(source);
            self.store.insert(entry);
            evicted
        };
        self.publish_evictions(category, &evicted);
    }

    /// 写入缓存值
    ///
    /// Fast层写入成功即为成功；Remote/Persistent按策略写穿，
    /// 失败只记日志。插入前先压回容量，写后更新自适应容量。
    pub async fn set(
        &self,
        key: &str,
        value: CacheValue,
        category: CacheCategory,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let policy = self.policies.get(category)?;
        let ttl = ttl.unwrap_or(policy.ttl);

        // 分类锁内先压回容量再插入：并发set同分类串行，插入后
        // `count <= current_size` 与交错无关地成立。锁不跨await。
        let (evicted, bytes) = {
            let _category_guard = self.category_lock(category);
            let evicted = self.eviction.ensure_capacity(category, policy.strategy, 1);
            let _guard = self.store.lock_key(key);
            let entry = CacheEntry::new(key, value, category, Some(ttl));
            let bytes = entry.value.to_bytes();
            self.store.insert(entry);
            (evicted, bytes)
        };
        self.publish_evictions(category, &evicted);

        self.stats.record_write(category);
        self.sizer.update(category, SizeDirection::Increase);

        // 慢层写穿（尽力而为）
        match bytes {
            Ok(bytes) => {
                if policy.has_tier(CacheTier::Remote) {
                    if let Some(remote) = &self.remote {
                        if let Err(e) = remote.set(key, &bytes, Some(ttl)).await {
                            warn!("Remote层写入失败: key={} error={}", key, e);
                        }
                    }
                }
                if policy.has_tier(CacheTier::Persistent) {
                    if let Some(persistent) = &self.persistent {
                        if let Err(e) = persistent.set(key, &bytes).await {
                            warn!("Persistent层写入失败: key={} error={}", key, e);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("值序列化失败，跳过慢层写穿: key={} error={}", key, e);
            }
        }

        Ok(())
    }

    /// 删除缓存值
    ///
    /// 从分类配置的所有层移除；至少一层存在该键时返回true。
    /// 删除不存在的键返回false，不是错误。
    pub async fn delete(&self, key: &str, category: CacheCategory) -> Result<bool, CacheError> {
        let policy = self.policies.get(category)?;
        let removed = self.delete_across_tiers(key, &policy).await;

        if removed {
            self.stats.record_invalidations(1);
            self.bus.publish(&InvalidationEvent::new(
                Some(category),
                key,
                InvalidationReason::Explicit,
            ));
        }
        Ok(removed)
    }

    async fn delete_across_tiers(&self, key: &str, policy: &CachePolicy) -> bool {
        let mut removed = {
            let _guard = self.store.lock_key(key);
            self.store.remove(key).is_some()
        };

        if policy.has_tier(CacheTier::Remote) {
            if let Some(remote) = &self.remote {
                match remote.delete(key).await {
                    Ok(existed) => removed |= existed,
                    Err(e) => warn!("Remote层删除失败: key={} error={}", key, e),
                }
            }
        }
        if policy.has_tier(CacheTier::Persistent) {
            if let Some(persistent) = &self.persistent {
                match persistent.delete(key).await {
                    Ok(existed) => removed |= existed,
                    Err(e) => warn!("Persistent层删除失败: key={} error={}", key, e),
                }
            }
        }
        removed
    }

    /// 模式失效
    ///
    /// 子串匹配（非glob/正则）。Fast层按条目分类精确过滤；慢层键
    /// 无分类元数据，依赖键名约定中的分类标签过滤。返回去重后的
    /// 移除键数。
    pub async fn invalidate_by_pattern(
        &self,
        pattern: &str,
        category: CacheCategory,
    ) -> Result<usize, CacheError> {
        let policy = self.policies.get(category)?;
        let mut removed_keys: HashSet<String> = HashSet::new();

        for key in self.store.scan_matching(pattern, category) {
            let _guard = self.store.lock_key(&key);
            if self.store.remove(&key).is_some() {
                removed_keys.insert(key);
            }
        }

        if policy.has_tier(CacheTier::Remote) {
            if let Some(remote) = &self.remote {
                match remote.scan(pattern).await {
                    Ok(keys) => {
                        for key in keys {
                            if CacheCategory::from_key(&key) != Some(category) {
                                continue;
                            }
                            match remote.delete(&key).await {
                                Ok(true) => {
                                    removed_keys.insert(key);
                                }
                                Ok(false) => {}
                                Err(e) => warn!("Remote层删除失败: key={} error={}", key, e),
                            }
                        }
                    }
                    Err(e) => warn!("Remote层扫描失败: pattern={} error={}", pattern, e),
                }
            }
        }

        if policy.has_tier(CacheTier::Persistent) {
            if let Some(persistent) = &self.persistent {
                match persistent.scan(pattern).await {
                    Ok(keys) => {
                        for key in keys {
                            if CacheCategory::from_key(&key) != Some(category) {
                                continue;
                            }
                            match persistent.delete(&key).await {
                                Ok(true) => {
                                    removed_keys.insert(key);
                                }
                                Ok(false) => {}
                                Err(e) => warn!("Persistent层删除失败: key={} error={}", key, e),
                            }
                        }
                    }
                    Err(e) => warn!("Persistent层扫描失败: pattern={} error={}", pattern, e),
                }
            }
        }

        let count = removed_keys.len();
        if count > 0 {
            info!("模式失效: pattern={} category={} removed={}", pattern, category, count);
        }
        self.stats.record_invalidations(count as u64);
        self.bus.publish(&InvalidationEvent::new(
            Some(category),
            pattern,
            InvalidationReason::Pattern,
        ));
        Ok(count)
    }

    /// 依赖失效（单跳）
    ///
    /// 失效source_key登记的全部依赖键；不级联到依赖这些键的键。
    /// 依赖记录未显式携带分类时回退键名约定推断，推断失败的键
    /// 跳过并记日志。
    pub async fn invalidate_by_dependency(&self, source_key: &str) -> Result<usize, CacheError> {
        let Some(dependency) = self.bus.dependency_of(source_key) else {
            return Ok(0);
        };

        let mut removed = 0;
        for dependent_key in &dependency.dependent_keys {
            let category = dependency
                .category
                .or_else(|| CacheCategory::from_key(dependent_key));
            let Some(category) = category else {
                warn!("依赖键无法解析分类，跳过: key={}", dependent_key);
                continue;
            };
            let policy = self.policies.get(category)?;
            if self.delete_across_tiers(dependent_key, &policy).await {
                removed += 1;
            }
        }

        self.stats.record_invalidations(removed as u64);
        self.bus.publish(&InvalidationEvent::new(
            dependency.category,
            source_key,
            InvalidationReason::Dependency,
        ));
        Ok(removed)
    }

    /// 跨链失效
    ///
    /// 对固定模式片段集逐一调用模式失效并聚合计数；省略chain_to
    /// 时目标为该钱包的所有链。
    pub async fn invalidate_cross_chain(
        &self,
        wallet: &str,
        chain_from: &str,
        chain_to: Option<&str>,
    ) -> Result<usize, CacheError> {
        let mut total = 0;
        for (pattern, category) in cross_chain_patterns(wallet, chain_from, chain_to) {
            total += self.invalidate_by_pattern(&pattern, category).await?;
        }

        info!(
            "跨链失效: wallet={} chain_from={} chain_to={:?} removed={}",
            wallet, chain_from, chain_to, total
        );
        self.bus.publish(&InvalidationEvent::new(
            None,
            wallet,
            InvalidationReason::CrossChain,
        ));
        Ok(total)
    }

    /// 批量预热
    ///
    /// 已缓存的键跳过（不计入warmed）；未缓存的键经fetch取数，
    /// 取到值则按分类默认TTL写入。单键失败不影响整批。
    pub async fn warm(
        self: &Arc<Self>,
        keys: Vec<(String, CacheCategory)>,
        fetch: FetchFn,
    ) -> Result<usize, CacheError> {
        // 缺失策略在起跑前整体暴露，而不是在批次中途
        let mut seen = HashSet::new();
        for (_, category) in &keys {
            if seen.insert(*category) {
                self.policies.get(*category)?;
            }
        }

        self.prefetch.reset();
        let manager = Arc::clone(self);
        let warmed = self
            .prefetch
            .run(keys, move |key, category| {
                let manager = Arc::clone(&manager);
                let fetch = Arc::clone(&fetch);
                async move { manager.warm_one(&key, category, fetch).await }
            })
            .await;
        Ok(warmed)
    }

    async fn warm_one(&self, key: &str, category: CacheCategory, fetch: FetchFn) -> WarmOutcome {
        match self.get(key, category).await {
            Ok(Some(_)) => return WarmOutcome::AlreadyCached,
            Ok(None) => {}
            Err(e) => {
                warn!("预热读取失败: key={} error={}", key, e);
                return WarmOutcome::FetchFailed;
            }
        }
        match fetch(key.to_string()).await {
            Ok(Some(value)) => match self.set(key, value, category, None).await {
                Ok(()) => WarmOutcome::Warmed,
                Err(e) => {
                    warn!("预热写入失败: key={} error={}", key, e);
                    WarmOutcome::FetchFailed
                }
            },
            Ok(None) => WarmOutcome::FetchMiss,
            Err(e) => {
                warn!("预热取数失败: key={} error={}", key, e);
                WarmOutcome::FetchFailed
            }
        }
    }

    /// 单飞读取或加载
    ///
    /// 缓存命中直接返回；未命中时同键并发加载收敛为一次loader
    /// 调用，加载的值按分类默认TTL写入后广播给等待者。
    pub async fn get_or_load<F, Fut>(
        &self,
        key: &str,
        category: CacheCategory,
        loader: F,
    ) -> Result<Option<CacheValue>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Option<CacheValue>, TierError>>,
    {
        if let Some(value) = self.get(key, category).await? {
            return Ok(Some(value));
        }

        let loaded = self.single_flight.load(key, loader).await?;
        if let Some(value) = &loaded {
            self.set(key, value.clone(), category, None).await?;
        }
        Ok(loaded)
    }

    // ------------------------------------------------------------------
    // 管理接口
    // ------------------------------------------------------------------

    /// 注册失效订阅者
    pub fn subscribe(
        &self,
        callback: InvalidationCallback,
        category: Option<CacheCategory>,
    ) -> Uuid {
        self.bus.subscribe(callback, category)
    }

    /// 注销失效订阅者
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        self.bus.unsubscribe(id)
    }

    /// 登记依赖边（set的依赖参数与管理接口共用）
    pub fn register_dependency(
        &self,
        source_key: impl Into<String>,
        dependent_keys: impl IntoIterator<Item = String>,
        dependency_type: impl Into<String>,
        category: Option<CacheCategory>,
    ) {
        self.bus
            .register_dependency(source_key, dependent_keys, dependency_type, category);
    }

    /// 替换分类策略并同步自适应容量边界
    ///
    /// 缩容即刻按新策略压回容量，不等下一次写入。
    pub fn set_policy(&self, policy: CachePolicy) -> Result<(), CacheError> {
        let category = policy.category;
        let max_entries = policy.max_entries;
        let strategy = policy.strategy;
        self.policies.set(policy)?;
        let evicted = {
            let _guard = self.category_lock(category);
            self.sizer.reconfigure(category, max_entries);
            self.eviction.ensure_capacity(category, strategy, 0)
        };
        self.publish_evictions(category, &evicted);
        info!("策略已更新: category={}", category);
        Ok(())
    }

    /// 查询分类策略
    pub fn get_policy(&self, category: CacheCategory) -> Result<CachePolicy, CacheError> {
        self.policies.get(category)
    }

    /// 统计快照
    pub fn get_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// 仪表盘快照（计数器 + 策略 + 自适应状态 + 健康指标）
    pub fn get_dashboard(&self) -> DashboardSnapshot {
        let mut adaptive_sizes = HashMap::new();
        let mut entry_counts = HashMap::new();
        for category in CacheCategory::ALL {
            adaptive_sizes.insert(category.as_str().to_string(), self.sizer.snapshot(category));
            entry_counts.insert(category.as_str().to_string(), self.store.count(category));
        }
        DashboardSnapshot {
            stats: self.stats.snapshot(),
            policies: self.policies.snapshot(),
            adaptive_sizes,
            entry_counts,
            expiring_soon: self
                .store
                .expiring_within(Duration::from_secs(EXPIRING_SOON_WINDOW_SECS)),
        }
    }

    /// 健康检查：各层可达性与条目数
    pub async fn health_check(&self) -> HealthReport {
        let remote = match &self.remote {
            Some(remote) => match remote.ping().await {
                Ok(()) => TierHealth {
                    configured: true,
                    reachable: true,
                    entries: remote.size().await.ok(),
                },
                Err(e) => {
                    warn!("Remote层健康检查失败: {}", e);
                    TierHealth {
                        configured: true,
                        reachable: false,
                        entries: None,
                    }
                }
            },
            None => TierHealth {
                configured: false,
                reachable: false,
                entries: None,
            },
        };
        let persistent = match &self.persistent {
            Some(persistent) => match persistent.ping().await {
                Ok(()) => TierHealth {
                    configured: true,
                    reachable: true,
                    entries: persistent.size().await.ok(),
                },
                Err(e) => {
                    warn!("Persistent层健康检查失败: {}", e);
                    TierHealth {
                        configured: true,
                        reachable: false,
                        entries: None,
                    }
                }
            },
            None => TierHealth {
                configured: false,
                reachable: false,
                entries: None,
            },
        };
        HealthReport {
            fast_entries: self.store.len(),
            remote,
            persistent,
        }
    }

    /// 主动清理Fast层过期条目（代替读取时的惰性过期）
    pub fn cleanup_expired(&self) -> usize {
        let count = self.store.cleanup_expired();
        self.stats.record_expirations(count as u64);
        if count > 0 {
            // 主动清理聚合为一条事件，不逐键发布
            self.bus.publish(&InvalidationEvent::new(
                None,
                "*",
                InvalidationReason::Expired,
            ));
        }
        count
    }

    /// 清空所有层与依赖图
    pub async fn clear_all(&self) {
        self.store.clear();
        self.bus.clear_dependencies();

        // 慢层无整体清空接口，借助空模式扫描逐键删除（尽力而为）
        if let Some(remote) = &self.remote {
            match remote.scan("").await {
                Ok(keys) => {
                    for key in keys {
                        if let Err(e) = remote.delete(&key).await {
                            warn!("Remote层清空删除失败: key={} error={}", key, e);
                        }
                    }
                }
                Err(e) => warn!("Remote层清空扫描失败: {}", e),
            }
        }
        if let Some(persistent) = &self.persistent {
            match persistent.scan("").await {
                Ok(keys) => {
                    for key in keys {
                        if let Err(e) = persistent.delete(&key).await {
                            warn!("Persistent层清空删除失败: key={} error={}", key, e);
                        }
                    }
                }
                Err(e) => warn!("Persistent层清空扫描失败: {}", e),
            }
        }

        info!("缓存已全量清空");
        self.bus.publish(&InvalidationEvent::new(
            None,
            "*",
            InvalidationReason::Cleared,
        ));
    }

    /// 完整性审计
    ///
    /// 重算Fast层条目校验和并与存储值比对；只报告不纠正。
    pub fn audit_integrity(&self, category: Option<CacheCategory>) -> IntegrityReport {
        let categories: Vec<CacheCategory> = match category {
            Some(category) => vec![category],
            None => CacheCategory::ALL.to_vec(),
        };
        let mut report = IntegrityReport::default();
        for category in categories {
            for entry in self.store.entries_of(category) {
                report.checked += 1;
                if !entry.verify_checksum() {
                    report.violations.push(IntegrityViolation {
                        key: entry.key.clone(),
                        expected: entry.checksum.clone(),
                        actual: entry.value.checksum(),
                    });
                }
            }
        }
        if !report.is_clean() {
            warn!("完整性审计发现 {} 处不匹配", report.violations.len());
        }
        report
    }

    /// 停止后台任务、取消在途预热并拒绝后续预热批次
    pub fn shutdown(&self) {
        self.prefetch.shutdown();
        if let Some(handle) = self.maintenance_handle.lock().take() {
            handle.abort();
        }
    }

    /// 后台巡检任务
    ///
    /// 周期执行主动过期清理，并对读取量足够、命中率持续过低的
    /// 分类缩容。持有Weak引用，管理器释放后自然退出。
    fn start_maintenance(manager: Weak<TieredCacheManager>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let cleaned = manager.cleanup_expired();
                debug!("后台巡检: 清理过期条目 {}", cleaned);

                for category in CacheCategory::ALL {
                    if manager.stats.category_read_total(category) >= 100
                        && manager.stats.category_hit_rate(category) < ADAPTIVE_SHRINK_HIT_RATE
                    {
                        let Ok(policy) = manager.policies.get(category) else {
                            continue;
                        };
                        // 缩容后立即压回新目标，保持容量不变式
                        let evicted = {
                            let _guard = manager.category_lock(category);
                            manager.sizer.update(category, SizeDirection::Decrease);
                            manager.eviction.ensure_capacity(category, policy.strategy, 0)
                        };
                        manager.publish_evictions(category, &evicted);
                        debug!("低命中率缩容: category={}", category);
                    }
                }
            }
        })
    }

    /// 取消在途预热批次（不影响其他操作）
    pub fn cancel_warming(&self) {
        self.prefetch.cancel_all();
    }
}

impl Drop for TieredCacheManager {
    fn drop(&mut self) {
        if let Some(handle) = self.maintenance_handle.lock().take() {
            handle.abort();
        }
    }
}
