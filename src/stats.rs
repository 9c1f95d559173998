//! 统计收集器
//!
//! 无锁原子计数器记录命中/未命中/写入/淘汰/失效，并提供按分类
//! 细分与仪表盘快照。快照是只读时点视图，无副作用。

use crate::adaptive::AdaptiveSizeState;
use crate::entry::{CacheCategory, CacheTier};
use crate::policy::CachePolicy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

const CATEGORY_COUNT: usize = CacheCategory::ALL.len();

/// 统计收集器
#[derive(Debug, Default)]
pub struct StatsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    expirations: AtomicU64,
    /// 按来源层的命中细分
    fast_hits: AtomicU64,
    remote_hits: AtomicU64,
    persistent_hits: AtomicU64,
    /// 按分类细分
    category_hits: [AtomicU64; CATEGORY_COUNT],
    category_misses: [AtomicU64; CATEGORY_COUNT],
    category_writes: [AtomicU64; CATEGORY_COUNT],
    category_evictions: [AtomicU64; CATEGORY_COUNT],
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self, category: CacheCategory, tier: CacheTier) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.category_hits[category.ordinal()].fetch_add(1, Ordering::Relaxed);
        match tier {
            CacheTier::Fast => self.fast_hits.fetch_add(1, Ordering::Relaxed),
            CacheTier::Remote => self.remote_hits.fetch_add(1, Ordering::Relaxed),
            CacheTier::Persistent => self.persistent_hits.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_miss(&self, category: CacheCategory) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.category_misses[category.ordinal()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self, category: CacheCategory) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.category_writes[category.ordinal()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self, category: CacheCategory) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        self.category_evictions[category.ordinal()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// 分类命中率（自适应缩容巡检用）
    pub fn category_hit_rate(&self, category: CacheCategory) -> f64 {
        let hits = self.category_hits[category.ordinal()].load(Ordering::Relaxed);
        let misses = self.category_misses[category.ordinal()].load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// 分类是否有足够读取量参与低命中率判定
    pub fn category_read_total(&self, category: CacheCategory) -> u64 {
        self.category_hits[category.ordinal()].load(Ordering::Relaxed)
            + self.category_misses[category.ordinal()].load(Ordering::Relaxed)
    }

    /// 计数器快照
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut categories = HashMap::new();
        for category in CacheCategory::ALL {
            let i = category.ordinal();
            categories.insert(
                category.as_str().to_string(),
                CategoryStats {
                    hits: self.category_hits[i].load(Ordering::Relaxed),
                    misses: self.category_misses[i].load(Ordering::Relaxed),
                    writes: self.category_writes[i].load(Ordering::Relaxed),
                    evictions: self.category_evictions[i].load(Ordering::Relaxed),
                },
            );
        }
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            writes: self.writes(),
            evictions: self.evictions(),
            invalidations: self.invalidations(),
            expirations: self.expirations(),
            hit_rate: self.hit_rate(),
            fast_hits: self.fast_hits.load(Ordering::Relaxed),
            remote_hits: self.remote_hits.load(Ordering::Relaxed),
            persistent_hits: self.persistent_hits.load(Ordering::Relaxed),
            categories,
        }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.invalidations.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
        self.fast_hits.store(0, Ordering::Relaxed);
        self.remote_hits.store(0, Ordering::Relaxed);
        self.persistent_hits.store(0, Ordering::Relaxed);
        for i in 0..CATEGORY_COUNT {
            self.category_hits[i].store(0, Ordering::Relaxed);
            self.category_misses[i].store(0, Ordering::Relaxed);
            self.category_writes[i].store(0, Ordering::Relaxed);
            self.category_evictions[i].store(0, Ordering::Relaxed);
        }
    }
}

/// 分类统计细分
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
}

/// 计数器快照
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub expirations: u64,
    pub hit_rate: f64,
    pub fast_hits: u64,
    pub remote_hits: u64,
    pub persistent_hits: u64,
    pub categories: HashMap<String, CategoryStats>,
}

/// 仪表盘快照
///
/// 计数器、当前策略、自适应容量状态与健康指标的时点视图。
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub stats: StatsSnapshot,
    pub policies: Vec<CachePolicy>,
    pub adaptive_sizes: HashMap<String, AdaptiveSizeState>,
    /// 按分类的Fast层活跃条目数
    pub entry_counts: HashMap<String, usize>,
    /// N分钟内将过期的条目数（泄漏/健康指标）
    pub expiring_soon: usize,
}
