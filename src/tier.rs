//! 层协作者抽象
//!
//! 定义Remote/Persistent层客户端接口与内存测试替身。
//! 线协议与具体产品实现不在本引擎范围内；协作者的任何错误
//! 对引擎都等价于该层未命中。

use crate::error::TierError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Remote层客户端接口
///
/// 共享的跨进程缓存层（如远程KV存储），支持原生TTL过期。
#[async_trait]
pub trait RemoteTierClient: Send + Sync {
    /// 获取值
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError>;

    /// 设置值
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), TierError>;

    /// 删除值，返回键是否存在
    async fn delete(&self, key: &str) -> Result<bool, TierError>;

    /// 子串模式扫描，返回匹配键
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, TierError>;

    /// 条目数
    async fn size(&self) -> Result<usize, TierError>;

    /// 可达性探测
    async fn ping(&self) -> Result<(), TierError>;
}

/// Persistent层客户端接口
///
/// 形状与Remote层一致，但无原生TTL过期：条目逻辑带时间戳，
/// 保留策略由协作者自身负责（引擎不清扫持久层）。
#[async_trait]
pub trait PersistentTierClient: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), TierError>;

    async fn delete(&self, key: &str) -> Result<bool, TierError>;

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, TierError>;

    async fn size(&self) -> Result<usize, TierError>;

    async fn ping(&self) -> Result<(), TierError>;
}

/// Remote层内存替身
///
/// 遵循接口语义（含TTL过期），用于单元/集成测试与内嵌部署。
pub struct InMemoryRemoteTier {
    data: DashMap<String, (Vec<u8>, Option<Instant>)>,
}

impl InMemoryRemoteTier {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }
}

impl Default for InMemoryRemoteTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteTierClient for InMemoryRemoteTier {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError> {
        let expired = match self.data.get(key) {
            Some(entry) => match entry.1 {
                Some(deadline) => Instant::now() >= deadline,
                None => false,
            },
            None => return Ok(None),
        };
        if expired {
            self.data.remove(key);
            return Ok(None);
        }
        Ok(self.data.get(key).map(|entry| entry.0.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), TierError> {
        let deadline = ttl.map(|d| Instant::now() + d);
        self.data.insert(key.to_string(), (value.to_vec(), deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, TierError> {
        Ok(self.data.remove(key).is_some())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, TierError> {
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.key().contains(pattern))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn size(&self) -> Result<usize, TierError> {
        Ok(self.data.len())
    }

    async fn ping(&self) -> Result<(), TierError> {
        Ok(())
    }
}

/// Persistent层内存替身
///
/// 无TTL语义，条目保留至显式删除。
pub struct InMemoryPersistentTier {
    data: DashMap<String, Vec<u8>>,
}

impl InMemoryPersistentTier {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }
}

impl Default for InMemoryPersistentTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistentTierClient for InMemoryPersistentTier {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError> {
        Ok(self.data.get(key).map(|entry| entry.clone()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), TierError> {
        self.data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, TierError> {
        Ok(self.data.remove(key).is_some())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, TierError> {
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.key().contains(pattern))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn size(&self) -> Result<usize, TierError> {
        Ok(self.data.len())
    }

    async fn ping(&self) -> Result<(), TierError> {
        Ok(())
    }
}
