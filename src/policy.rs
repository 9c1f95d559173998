//! 策略模块
//!
//! 定义按分类的缓存策略及策略注册表。
//! 每个分类必须有策略；缺失策略是配置错误，绝不静默兜底。

use crate::constants::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS};
use crate::entry::{CacheCategory, CacheTier};
use crate::error::CacheError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// 淘汰策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionStrategy {
    /// 淘汰最久未访问的条目
    Lru,
    /// 淘汰访问次数最少的条目
    Lfu,
    /// 淘汰最先过期的条目
    Ttl,
    /// LRU/LFU加权混合
    Adaptive,
}

/// 分类缓存策略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicy {
    /// 数据分类
    pub category: CacheCategory,
    /// 淘汰策略
    pub strategy: EvictionStrategy,
    /// 默认TTL
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// 容量上限（自适应容量的初值与上界来源）
    pub max_entries: usize,
    /// 是否启用预热
    pub prefetch_enabled: bool,
    /// 是否参与跨链失效
    pub cross_chain_sync_enabled: bool,
    /// 写入/读取的层级（有序，必须含Fast）
    pub tiers: Vec<CacheTier>,
    /// 失效模式模板
    pub invalidation_rules: Vec<String>,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

impl CachePolicy {
    /// 创建使用默认TTL/容量的策略
    pub fn new(category: CacheCategory, strategy: EvictionStrategy) -> Self {
        Self {
            category,
            strategy,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_entries: DEFAULT_MAX_ENTRIES,
            prefetch_enabled: false,
            cross_chain_sync_enabled: false,
            tiers: vec![CacheTier::Fast],
            invalidation_rules: Vec::new(),
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn prefetch_enabled(mut self, enabled: bool) -> Self {
        self.prefetch_enabled = enabled;
        self
    }

    pub fn cross_chain_sync_enabled(mut self, enabled: bool) -> Self {
        self.cross_chain_sync_enabled = enabled;
        self
    }

    pub fn tiers(mut self, tiers: Vec<CacheTier>) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn invalidation_rules(mut self, rules: Vec<String>) -> Self {
        self.invalidation_rules = rules;
        self
    }

    /// 是否配置了指定层
    pub fn has_tier(&self, tier: CacheTier) -> bool {
        self.tiers.contains(&tier)
    }

    /// 校验策略
    ///
    /// 不变式：tiers非空且必须包含Fast；max_entries必须大于0。
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.tiers.is_empty() {
            return Err(CacheError::ConfigError(format!(
                "分类[{}]的层级列表不能为空",
                self.category
            )));
        }
        if !self.tiers.contains(&CacheTier::Fast) {
            return Err(CacheError::ConfigError(format!(
                "分类[{}]的层级列表必须包含Fast层",
                self.category
            )));
        }
        if self.max_entries == 0 {
            return Err(CacheError::ConfigError(format!(
                "分类[{}]的容量上限必须大于0",
                self.category
            )));
        }
        if self.ttl.is_zero() {
            return Err(CacheError::ConfigError(format!(
                "分类[{}]的TTL必须大于0",
                self.category
            )));
        }
        Ok(())
    }
}

/// 策略配置文件结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyFile {
    pub policies: Vec<CachePolicy>,
}

/// 策略注册表
///
/// 构造时为所有分类播种默认策略，可在运行时被管理调用原子替换。
pub struct PolicyRegistry {
    policies: RwLock<HashMap<CacheCategory, CachePolicy>>,
}

impl PolicyRegistry {
    /// 创建带内置默认策略的注册表
    pub fn with_defaults() -> Self {
        let mut policies = HashMap::new();
        for policy in Self::default_policies() {
            policies.insert(policy.category, policy);
        }
        Self {
            policies: RwLock::new(policies),
        }
    }

    /// 创建空注册表（测试缺失策略路径时使用）
    pub fn empty() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
        }
    }

    /// 内置默认策略
    ///
    /// TTL取值对应上游数据的陈旧容忍度：价格最短，合约元数据最长。
    fn default_policies() -> Vec<CachePolicy> {
        use CacheCategory::*;
        use CacheTier::*;
        vec![
            CachePolicy::new(TokenInfo, EvictionStrategy::Lru)
                .ttl(Duration::from_secs(3600))
                .max_entries(5_000)
                .prefetch_enabled(true)
                .tiers(vec![Fast, Remote, Persistent]),
            CachePolicy::new(Balance, EvictionStrategy::Lru)
                .ttl(Duration::from_secs(30))
                .max_entries(10_000)
                .cross_chain_sync_enabled(true)
                .tiers(vec![Fast, Remote])
                .invalidation_rules(vec!["balance_{wallet}_".to_string()]),
            CachePolicy::new(CrossChainBalance, EvictionStrategy::Lru)
                .ttl(Duration::from_secs(60))
                .max_entries(5_000)
                .cross_chain_sync_enabled(true)
                .tiers(vec![Fast, Remote])
                .invalidation_rules(vec!["cross_chain_{wallet}_".to_string()]),
            CachePolicy::new(TxHistory, EvictionStrategy::Lru)
                .ttl(Duration::from_secs(300))
                .max_entries(2_000)
                .cross_chain_sync_enabled(true)
                .tiers(vec![Fast, Remote, Persistent])
                .invalidation_rules(vec!["tx_history_{wallet}_".to_string()]),
            CachePolicy::new(PriceData, EvictionStrategy::Ttl)
                .ttl(Duration::from_secs(10))
                .max_entries(20_000)
                .prefetch_enabled(true)
                .tiers(vec![Fast]),
            CachePolicy::new(Analytics, EvictionStrategy::Adaptive)
                .ttl(Duration::from_secs(1800))
                .max_entries(1_000)
                .tiers(vec![Fast, Persistent]),
            CachePolicy::new(ContractData, EvictionStrategy::Lfu)
                .ttl(Duration::from_secs(86_400))
                .max_entries(5_000)
                .tiers(vec![Fast, Remote, Persistent]),
        ]
    }

    /// 获取分类策略
    ///
    /// 缺失策略是配置错误，直接向调用方传播。
    pub fn get(&self, category: CacheCategory) -> Result<CachePolicy, CacheError> {
        self.policies
            .read()
            .get(&category)
            .cloned()
            .ok_or_else(|| CacheError::ConfigError(format!("分类[{}]缺失缓存策略", category)))
    }

    /// 原子替换分类策略
    pub fn set(&self, policy: CachePolicy) -> Result<(), CacheError> {
        policy.validate()?;
        self.policies.write().insert(policy.category, policy);
        Ok(())
    }

    /// 所有策略快照
    pub fn snapshot(&self) -> Vec<CachePolicy> {
        let mut policies: Vec<CachePolicy> = self.policies.read().values().cloned().collect();
        policies.sort_by_key(|p| p.category.as_str());
        policies
    }

    /// 从YAML或JSON文件加载策略并校验
    ///
    /// 文件中的策略覆盖同分类的现有策略，未出现的分类保持不变。
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize, CacheError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let file: PolicyFile = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        for policy in &file.policies {
            policy.validate()?;
        }
        let count = file.policies.len();
        let mut policies = self.policies.write();
        for policy in file.policies {
            policies.insert(policy.category, policy);
        }
        Ok(count)
    }
}
