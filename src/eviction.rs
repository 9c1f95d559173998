//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 淘汰引擎
//!
//! 分类条目数超过自适应容量目标时按策略选出牺牲者。
//! 每次调用精确移除一个条目后重查容量，循环直至回到容量内。

use crate::adaptive::AdaptiveSizer;
use crate::constants::{ADAPTIVE_FREQUENCY_WEIGHT, ADAPTIVE_IDLE_WEIGHT};
use crate::entry::CacheCategory;
use crate::entry_store::{EntryStore, EvictionCandidate};
use crate::policy::EvictionStrategy;
use crate::stats::StatsCollector;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// 淘汰引擎
pub struct EvictionEngine {
    store: Arc<EntryStore>,
    sizer: Arc<AdaptiveSizer>,
    stats: Arc<StatsCollector>,
}

impl EvictionEngine {
    pub fn new(store: Arc<EntryStore>, sizer: Arc<AdaptiveSizer>, stats: Arc<StatsCollector>) -> Self {
        Self { store, sizer, stats }
    }

    /// 将分类压回容量目标之内，返回被淘汰的键
    ///
    /// 调用方持分类锁串行调用：插入后 `count <= current_size` 恒成立。
    /// `headroom` 为本次即将插入的条目数（插入前调用为1，纯压回为0）。
    /// 失效事件由调用方在释放分类锁后按返回的键发布。
    pub fn ensure_capacity(
        &self,
        category: CacheCategory,
        strategy: EvictionStrategy,
        headroom: usize,
    ) -> Vec<String> {
        let mut evicted = Vec::new();
        loop {
            let target = self.sizer.current_size(category);
            let count = self.store.count(category);
            if count + headroom <= target {
                break;
            }

            let candidates = self.store.candidates(category);
            let victim = match select_victim(strategy, &candidates) {
                Some(victim) => victim,
                // 计数与快照竞争下可能选不出牺牲者，放弃本轮
                None => break,
            };

            if self.store.remove(&victim).is_some() {
                self.stats.record_eviction(category);
                debug!("淘汰条目: category={} key={} strategy={:?}", category, victim, strategy);
                evicted.push(victim);
            } else {
                // 并发删除抢先，重新快照
                continue;
            }
        }
        evicted
    }
}

/// 按策略选出牺牲者键
///
/// 所有策略确定性排序，同分时取字典序最小的键。
pub fn select_victim(
    strategy: EvictionStrategy,
    candidates: &[EvictionCandidate],
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    let victim = match strategy {
        // 最久未访问
        EvictionStrategy::Lru => candidates
            .iter()
            .min_by(|a, b| {
                a.last_accessed_at
                    .cmp(&b.last_accessed_at)
                    .then_with(|| a.key.cmp(&b.key))
            })?,
        // 访问次数最少
        EvictionStrategy::Lfu => candidates
            .iter()
            .min_by(|a, b| {
                a.access_count
                    .cmp(&b.access_count)
                    .then_with(|| a.key.cmp(&b.key))
            })?,
        // 最先过期；永不过期的条目排最后，全部永不过期时退化为LRU
        EvictionStrategy::Ttl => candidates
            .iter()
            .min_by(|a, b| match (a.expires_at, b.expires_at) {
                (Some(ea), Some(eb)) => ea.cmp(&eb).then_with(|| a.key.cmp(&b.key)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a
                    .last_accessed_at
                    .cmp(&b.last_accessed_at)
                    .then_with(|| a.key.cmp(&b.key)),
            })?,
        // 空闲时间与访问频率加权，得分最高者出局
        EvictionStrategy::Adaptive => {
            let now = Utc::now();
            candidates.iter().max_by(|a, b| {
                adaptive_score(a, now)
                    .partial_cmp(&adaptive_score(b, now))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // max_by取最后的最大值，键比较反转保证取字典序最小者
                    .then_with(|| b.key.cmp(&a.key))
            })?
        }
    };
    Some(victim.key.clone())
}

fn adaptive_score(candidate: &EvictionCandidate, now: chrono::DateTime<Utc>) -> f64 {
    let idle_secs = (now - candidate.last_accessed_at).num_milliseconds() as f64 / 1000.0;
    ADAPTIVE_IDLE_WEIGHT * idle_secs - ADAPTIVE_FREQUENCY_WEIGHT * candidate.access_count as f64
}
