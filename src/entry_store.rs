//! Fast层条目存储
//!
//! 进程内最快层。DashMap承载条目并发读写，条目级互斥由按
//! `hash(key) % LOCK_STRIPES` 选取的分段锁表提供：同键并发set在
//! Fast层写入与校验和计算期间串行化，锁绝不跨 `.await` 持有。

use crate::constants::LOCK_STRIPES;
use crate::entry::{CacheCategory, CacheEntry};
use ahash::RandomState;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Fast层读取结果
///
/// 惰性过期：过期条目在读取时被移除，与真正的未命中区分开，
/// 便于统计层分别计数。
#[derive(Debug)]
pub enum FastRead {
    /// 命中，访问信息已更新
    Hit(CacheEntry),
    /// 条目存在但已过期，已被移除
    Expired,
    /// 未命中
    Miss,
}

/// 淘汰候选信息（淘汰引擎打分用）
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    pub key: String,
    pub last_accessed_at: chrono::DateTime<Utc>,
    pub expires_at: Option<chrono::DateTime<Utc>>,
    pub access_count: u64,
}

/// Fast层条目存储
pub struct EntryStore {
    entries: DashMap<String, CacheEntry, RandomState>,
    /// 分段键锁表
    locks: Vec<Mutex<()>>,
    hasher: RandomState,
    /// 按分类的活跃条目计数
    counts: [AtomicUsize; CacheCategory::ALL.len()],
}

impl EntryStore {
    pub fn new() -> Self {
        let locks = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
            locks,
            hasher: RandomState::new(),
            counts: Default::default(),
        }
    }

    /// 获取键对应的分段锁
    ///
    /// 调用方在持锁期间完成读-改-写，期间不得await。
    pub fn lock_key(&self, key: &str) -> MutexGuard<'_, ()> {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        let stripe = (hasher.finish() as usize) & (LOCK_STRIPES - 1);
        self.locks[stripe].lock()
    }

    /// 读取条目（惰性过期）
    pub fn get(&self, key: &str) -> FastRead {
        // 先在持引用状态下判断过期，过期则释放引用后移除
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return FastRead::Miss,
        };

        if expired {
            // 判断与移除之间键可能已被并发set刷新，只移除仍过期的条目
            if let Some((_, entry)) = self.entries.remove_if(key, |_, entry| entry.is_expired()) {
                self.counts[entry.category.ordinal()].fetch_sub(1, Ordering::Relaxed);
                debug!("惰性过期移除: key={}", key);
                return FastRead::Expired;
            }
        }

        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired() => {
                entry.touch();
                FastRead::Hit(entry.clone())
            }
            // 判断与更新之间被并发删除或替换为已过期条目
            _ => FastRead::Miss,
        }
    }

    /// 写入条目，返回被替换的旧条目
    pub fn insert(&self, entry: CacheEntry) -> Option<CacheEntry> {
        let category = entry.category;
        let old = self.entries.insert(entry.key.clone(), entry);
        match &old {
            Some(old_entry) if old_entry.category == category => {}
            Some(old_entry) => {
                // 同键换分类：旧分类计数减一，新分类计数加一
                self.counts[old_entry.category.ordinal()].fetch_sub(1, Ordering::Relaxed);
                self.counts[category.ordinal()].fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.counts[category.ordinal()].fetch_add(1, Ordering::Relaxed);
            }
        }
        old
    }

    /// 移除条目
    pub fn remove(&self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key).map(|(_, entry)| entry);
        if let Some(entry) = &removed {
            self.counts[entry.category.ordinal()].fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// 键是否存在且未过期
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 分类活跃条目数
    pub fn count(&self, category: CacheCategory) -> usize {
        self.counts[category.ordinal()].load(Ordering::Relaxed)
    }

    /// 子串匹配扫描
    ///
    /// 按键子串包含且分类一致筛选，返回匹配键。模式是键前缀片段
    /// （如 `balance_{wallet}_`），不是glob或正则。
    pub fn scan_matching(&self, pattern: &str, category: CacheCategory) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.category == category && entry.key().contains(pattern))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// 分类淘汰候选快照
    pub fn candidates(&self, category: CacheCategory) -> Vec<EvictionCandidate> {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .map(|entry| EvictionCandidate {
                key: entry.key.clone(),
                last_accessed_at: entry.last_accessed_at,
                expires_at: entry.expires_at,
                access_count: entry.access_count,
            })
            .collect()
    }

    /// 分类条目快照（完整性审计用）
    pub fn entries_of(&self, category: CacheCategory) -> Vec<CacheEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .map(|entry| entry.clone())
            .collect()
    }

    /// 主动清理所有过期条目，返回清理数量
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect();

        let mut count = 0;
        for key in expired_keys {
            // 快照与移除之间被并发set刷新的键不再过期，跳过
            if let Some((_, entry)) = self
                .entries
                .remove_if(&key, |_, entry| entry.is_expired_at(now))
            {
                self.counts[entry.category.ordinal()].fetch_sub(1, Ordering::Relaxed);
                count += 1;
            }
        }
        if count > 0 {
            debug!("清理了 {} 条过期数据", count);
        }
        count
    }

    /// 将在指定窗口内过期的条目数（健康指标）
    pub fn expiring_within(&self, window: Duration) -> usize {
        let now = Utc::now();
        let deadline = now + ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::days(36_500));
        self.entries
            .iter()
            .filter(|entry| match entry.expires_at {
                Some(expires_at) => expires_at > now && expires_at <= deadline,
                None => false,
            })
            .count()
    }

    /// 清空存储
    pub fn clear(&self) {
        self.entries.clear();
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}
