//! 分层级联集成测试
//!
//! 测试场景：
//! 1. Fast -> Remote -> Persistent 读取级联与命中提升
//! 2. TTL到期后任何层都不返回过期值
//! 3. 协作层故障退化为未命中而非错误

use crate::common::create_tiered_manager;
use cacheron::{
    CacheCategory, CacheError, CacheValue, PersistentTierClient, RemoteTierClient, TierError,
    TieredCacheManager,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn test_full_cascade_promotes_to_all_upper_tiers() {
    let (manager, remote, persistent) = create_tiered_manager();

    // 值只存在于Persistent层
    let bytes = CacheValue::from(json!({"symbol": "ABC", "decimals": 18}))
        .to_bytes()
        .unwrap();
    persistent.set("token_info_abc", &bytes).await.unwrap();

    // 第一次读取：级联到Persistent并向上提升
    let value = manager
        .get("token_info_abc", CacheCategory::TokenInfo)
        .await
        .unwrap();
    assert_eq!(value, Some(json!({"symbol": "ABC", "decimals": 18}).into()));
    assert_eq!(manager.get_stats().persistent_hits, 1);
    assert!(remote.get("token_info_abc").await.unwrap().is_some());

    // 第二次读取：Fast层直接命中
    let value = manager
        .get("token_info_abc", CacheCategory::TokenInfo)
        .await
        .unwrap();
    assert!(value.is_some());
    let stats = manager.get_stats();
    assert_eq!(stats.fast_hits, 1);
    assert_eq!(stats.persistent_hits, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_expired_value_never_returned() {
    let (manager, remote, _) = create_tiered_manager();

    manager
        .set(
            "balance_w1_eth",
            json!("100").into(),
            CacheCategory::Balance,
            Some(Duration::from_millis(40)),
        )
        .await
        .unwrap();
    // 写穿时Remote层也携带同一TTL
    assert!(remote.get("balance_w1_eth").await.unwrap().is_some());

    sleep(Duration::from_millis(80)).await;

    let value = manager
        .get("balance_w1_eth", CacheCategory::Balance)
        .await
        .unwrap();
    assert_eq!(value, None);
    assert!(remote.get("balance_w1_eth").await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_own_write_within_process() {
    let (manager, _, _) = create_tiered_manager();

    manager
        .set(
            "balance_w1_eth",
            json!("1").into(),
            CacheCategory::Balance,
            None,
        )
        .await
        .unwrap();
    manager
        .set(
            "balance_w1_eth",
            json!("2").into(),
            CacheCategory::Balance,
            None,
        )
        .await
        .unwrap();

    let value = manager
        .get("balance_w1_eth", CacheCategory::Balance)
        .await
        .unwrap();
    assert_eq!(value, Some(json!("2").into()));
}

#[tokio::test]
async fn test_tier_failure_degrades_to_miss() {
    struct BrokenRemote;
    #[async_trait::async_trait]
    impl RemoteTierClient for BrokenRemote {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, TierError> {
            Err(TierError::TimeoutError("读取超时".to_string()))
        }
        async fn set(
            &self,
            _key: &str,
            _value: &[u8],
            _ttl: Option<Duration>,
        ) -> Result<(), TierError> {
            Err(TierError::TimeoutError("写入超时".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<bool, TierError> {
            Err(TierError::TimeoutError("删除超时".to_string()))
        }
        async fn scan(&self, _pattern: &str) -> Result<Vec<String>, TierError> {
            Err(TierError::TimeoutError("扫描超时".to_string()))
        }
        async fn size(&self) -> Result<usize, TierError> {
            Err(TierError::TimeoutError("统计超时".to_string()))
        }
        async fn ping(&self) -> Result<(), TierError> {
            Err(TierError::TimeoutError("探活超时".to_string()))
        }
    }

    let manager = TieredCacheManager::builder()
        .remote_tier(Arc::new(BrokenRemote))
        .build();

    // 读取不报错，写入仍成功
    let value = manager
        .get("balance_w1_eth", CacheCategory::Balance)
        .await
        .unwrap();
    assert_eq!(value, None);
    manager
        .set(
            "balance_w1_eth",
            json!("1").into(),
            CacheCategory::Balance,
            None,
        )
        .await
        .unwrap();
    assert!(manager
        .get("balance_w1_eth", CacheCategory::Balance)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_untiered_category_skips_collaborators() {
    let (manager, remote, persistent) = create_tiered_manager();

    // PriceData策略仅配置Fast层
    manager
        .set("price_abc", json!(1.23).into(), CacheCategory::PriceData, None)
        .await
        .unwrap();

    assert!(remote.get("price_abc").await.unwrap().is_none());
    assert!(persistent.get("price_abc").await.unwrap().is_none());
    assert!(manager
        .get("price_abc", CacheCategory::PriceData)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_missing_policy_propagates_config_error() {
    let manager = TieredCacheManager::builder()
        .policies(Arc::new(cacheron::PolicyRegistry::empty()))
        .build();

    let err = manager
        .get("balance_w1_eth", CacheCategory::Balance)
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::ConfigError(_)));
}
