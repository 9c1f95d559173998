//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! 缓存数据模型
//!
//! 定义缓存分类、层级、值封装与缓存条目。

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;

/// 缓存数据分类
///
/// 每个分类由独立的策略管理（TTL、淘汰、层级）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// 代币元数据
    TokenInfo,
    /// 单链余额
    Balance,
    /// 跨链余额
    CrossChainBalance,
    /// 交易历史
    TxHistory,
    /// 价格数据
    PriceData,
    /// 分析数据
    Analytics,
    /// 合约数据
    ContractData,
}

impl CacheCategory {
    /// 所有分类（按序，用于按分类遍历统计/策略）
    pub const ALL: [CacheCategory; 7] = [
        CacheCategory::TokenInfo,
        CacheCategory::Balance,
        CacheCategory::CrossChainBalance,
        CacheCategory::TxHistory,
        CacheCategory::PriceData,
        CacheCategory::Analytics,
        CacheCategory::ContractData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::TokenInfo => "token_info",
            CacheCategory::Balance => "balance",
            CacheCategory::CrossChainBalance => "cross_chain",
            CacheCategory::TxHistory => "tx_history",
            CacheCategory::PriceData => "price",
            CacheCategory::Analytics => "analytics",
            CacheCategory::ContractData => "contract",
        }
    }

    /// 键名约定中的分类标签
    ///
    /// 键约定：每个缓存键包含其分类标签（如 `balance_{wallet}_{chain}`）。
    pub fn key_tag(&self) -> &'static str {
        self.as_str()
    }

    /// 统计数组下标
    pub(crate) fn ordinal(&self) -> usize {
        match self {
            CacheCategory::TokenInfo => 0,
            CacheCategory::Balance => 1,
            CacheCategory::CrossChainBalance => 2,
            CacheCategory::TxHistory => 3,
            CacheCategory::PriceData => 4,
            CacheCategory::Analytics => 5,
            CacheCategory::ContractData => 6,
        }
    }

    /// 按键名约定反推分类（兼容路径）
    ///
    /// 依赖失效在依赖记录未显式携带分类时回退到此约定。
    /// 注意 `cross_chain` 必须先于 `balance` 检查，两者标签存在包含关系。
    pub fn from_key(key: &str) -> Option<CacheCategory> {
        if key.contains("cross_chain") {
            return Some(CacheCategory::CrossChainBalance);
        }
        for category in CacheCategory::ALL {
            if key.contains(category.key_tag()) {
                return Some(category);
            }
        }
        None
    }
}

impl std::fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 缓存层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    /// 进程内最快层
    Fast,
    /// 共享远程层
    Remote,
    /// 持久层
    Persistent,
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CacheTier::Fast => "fast",
            CacheTier::Remote => "remote",
            CacheTier::Persistent => "persistent",
        };
        f.write_str(s)
    }
}

/// 缓存值封装
///
/// 值对引擎不透明，统一通过 JSON 编解码在层间传输并参与校验和计算。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheValue(pub serde_json::Value);

impl CacheValue {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// 序列化为层间传输字节
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.0)
    }

    /// 从层间传输字节反序列化
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::from_slice(bytes)?))
    }

    /// 计算序列化内容的SHA-256校验和（十六进制）
    pub fn checksum(&self) -> String {
        let bytes = self.to_bytes().unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// 缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 缓存键（层内全局唯一）
    pub key: String,
    /// 缓存值
    pub value: CacheValue,
    /// 数据分类
    pub category: CacheCategory,
    /// 最近一次命中来源层
    pub tier: CacheTier,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 过期时间（None表示永不过期）
    pub expires_at: Option<DateTime<Utc>>,
    /// 访问次数
    pub access_count: u64,
    /// 最后访问时间
    pub last_accessed_at: DateTime<Utc>,
    /// 值内容校验和
    pub checksum: String,
    /// 自由元数据
    pub metadata: HashMap<String, String>,
}

impl CacheEntry {
    /// 创建新的缓存条目
    ///
    /// 校验和在创建时计算一次，此后用于完整性审计。
    pub fn new(
        key: impl Into<String>,
        value: CacheValue,
        category: CacheCategory,
        ttl: Option<Duration>,
    ) -> Self {
        let now = Utc::now();
        let expires_at = ttl.and_then(|d| {
            ChronoDuration::from_std(d)
                .ok()
                .map(|chrono_ttl| now + chrono_ttl)
        });
        let checksum = value.checksum();
        Self {
            key: key.into(),
            value,
            category,
            tier: CacheTier::Fast,
            created_at: now,
            expires_at,
            access_count: 0,
            last_accessed_at: now,
            checksum,
            metadata: HashMap::new(),
        }
    }

    /// 标记条目来源层（层间提升时使用）
    pub fn with_tier(mut self, tier: CacheTier) -> Self {
        self.tier = tier;
        self
    }

    /// 检查是否过期
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// 更新访问信息
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
        self.access_count += 1;
    }

    /// 重新计算校验和并与存储值比对
    pub fn verify_checksum(&self) -> bool {
        self.value.checksum() == self.checksum
    }
}
