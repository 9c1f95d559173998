//! 失效传播集成测试
//!
//! 测试场景：
//! 1. 模式失效覆盖Fast与协作层，按去重键计数
//! 2. 跨链失效的钱包级联场景
//! 3. 依赖失效单跳语义
//! 4. 订阅回调的送达与过滤

use crate::common::create_tiered_manager;
use cacheron::{CacheCategory, CacheValue, InvalidationReason, RemoteTierClient};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_pattern_invalidation_covers_all_tiers() {
    let (manager, remote, _) = create_tiered_manager();

    manager
        .set("balance_w1_eth", json!(1).into(), CacheCategory::Balance, None)
        .await
        .unwrap();
    manager
        .set("balance_w1_bsc", json!(2).into(), CacheCategory::Balance, None)
        .await
        .unwrap();
    // 只存在于Remote层的同钱包键
    let bytes = CacheValue::from(json!(3)).to_bytes().unwrap();
    remote.set("balance_w1_sol", &bytes, None).await.unwrap();

    let removed = manager
        .invalidate_by_pattern("balance_w1", CacheCategory::Balance)
        .await
        .unwrap();
    // Fast与Remote中的键去重后共3个
    assert_eq!(removed, 3);
    assert!(manager
        .get("balance_w1_eth", CacheCategory::Balance)
        .await
        .unwrap()
        .is_none());
    assert!(remote.get("balance_w1_sol").await.unwrap().is_none());
    assert_eq!(manager.get_stats().invalidations, 3);
}

#[tokio::test]
async fn test_pattern_invalidation_spares_other_categories() {
    let (manager, _, _) = create_tiered_manager();

    manager
        .set("balance_w1_eth", json!(1).into(), CacheCategory::Balance, None)
        .await
        .unwrap();
    manager
        .set(
            "tx_history_w1_eth",
            json!([]).into(),
            CacheCategory::TxHistory,
            None,
        )
        .await
        .unwrap();

    let removed = manager
        .invalidate_by_pattern("w1_eth", CacheCategory::Balance)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(manager
        .get("tx_history_w1_eth", CacheCategory::TxHistory)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_cross_chain_wallet_scenario() {
    let (manager, _, _) = create_tiered_manager();

    for (key, category) in [
        ("balance_W_eth", CacheCategory::Balance),
        ("balance_W_bsc", CacheCategory::Balance),
        ("cross_chain_W_eth_bsc", CacheCategory::CrossChainBalance),
        ("tx_history_W_eth", CacheCategory::TxHistory),
        ("tx_history_W_bsc", CacheCategory::TxHistory),
        // 无关钱包不受影响
        ("balance_X_eth", CacheCategory::Balance),
    ] {
        manager.set(key, json!(1).into(), category, None).await.unwrap();
    }

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    manager.subscribe(
        Arc::new(move |event| {
            sink.lock().push(event.reason);
            Ok(())
        }),
        None,
    );

    let removed = manager
        .invalidate_cross_chain("W", "eth", Some("bsc"))
        .await
        .unwrap();
    assert_eq!(removed, 5);

    for (key, category) in [
        ("balance_W_eth", CacheCategory::Balance),
        ("balance_W_bsc", CacheCategory::Balance),
        ("tx_history_W_eth", CacheCategory::TxHistory),
        ("tx_history_W_bsc", CacheCategory::TxHistory),
    ] {
        assert!(
            manager.get(key, category).await.unwrap().is_none(),
            "键未被跨链失效: {}",
            key
        );
    }
    assert!(manager
        .get("cross_chain_W_eth_bsc", CacheCategory::CrossChainBalance)
        .await
        .unwrap()
        .is_none());
    assert!(manager
        .get("balance_X_eth", CacheCategory::Balance)
        .await
        .unwrap()
        .is_some());

    // 每个片段一条Pattern事件，最后一条CrossChain事件
    let reasons = events.lock().clone();
    assert_eq!(
        reasons
            .iter()
            .filter(|r| **r == InvalidationReason::CrossChain)
            .count(),
        1
    );
    assert_eq!(reasons.last(), Some(&InvalidationReason::CrossChain));
}

#[tokio::test]
async fn test_cross_chain_without_target_chain() {
    let (manager, _, _) = create_tiered_manager();

    for key in ["balance_W_eth", "balance_W_bsc", "balance_W_sol"] {
        manager
            .set(key, json!(1).into(), CacheCategory::Balance, None)
            .await
            .unwrap();
    }

    // 省略chain_to：钱包在所有链上的余额都失效
    let removed = manager.invalidate_cross_chain("W", "eth", None).await.unwrap();
    assert_eq!(removed, 3);
}

#[tokio::test]
async fn test_dependency_invalidation_is_single_hop() {
    let (manager, _, _) = create_tiered_manager();

    manager
        .set(
            "analytics_ABC_1",
            json!({"v": 1}).into(),
            CacheCategory::Analytics,
            None,
        )
        .await
        .unwrap();
    manager
        .set(
            "analytics_ABC_2",
            json!({"v": 2}).into(),
            CacheCategory::Analytics,
            None,
        )
        .await
        .unwrap();
    manager
        .set(
            "contract_X",
            json!({"abi": []}).into(),
            CacheCategory::ContractData,
            None,
        )
        .await
        .unwrap();

    manager.register_dependency(
        "token_price_ABC",
        vec!["analytics_ABC_1".to_string(), "analytics_ABC_2".to_string()],
        "price_derived",
        Some(CacheCategory::Analytics),
    );
    // 二级依赖不应被级联触发
    manager.register_dependency(
        "analytics_ABC_1",
        vec!["contract_X".to_string()],
        "derived",
        Some(CacheCategory::ContractData),
    );

    let removed = manager.invalidate_by_dependency("token_price_ABC").await.unwrap();
    assert_eq!(removed, 2);
    assert!(manager
        .get("analytics_ABC_1", CacheCategory::Analytics)
        .await
        .unwrap()
        .is_none());
    assert!(manager
        .get("analytics_ABC_2", CacheCategory::Analytics)
        .await
        .unwrap()
        .is_none());
    // 单跳：contract_X保留
    assert!(manager
        .get("contract_X", CacheCategory::ContractData)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_dependency_unknown_source_is_noop() {
    let (manager, _, _) = create_tiered_manager();
    let removed = manager.invalidate_by_dependency("token_price_NONE").await.unwrap();
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn test_subscriber_category_filter() {
    let (manager, _, _) = create_tiered_manager();

    let balance_events = Arc::new(Mutex::new(0usize));
    let all_events = Arc::new(Mutex::new(0usize));

    let sink = Arc::clone(&balance_events);
    manager.subscribe(
        Arc::new(move |_event| {
            *sink.lock() += 1;
            Ok(())
        }),
        Some(CacheCategory::Balance),
    );
    let sink = Arc::clone(&all_events);
    let all_id = manager.subscribe(
        Arc::new(move |_event| {
            *sink.lock() += 1;
            Ok(())
        }),
        None,
    );

    manager
        .set("balance_w1_eth", json!(1).into(), CacheCategory::Balance, None)
        .await
        .unwrap();
    manager
        .set("price_abc", json!(2).into(), CacheCategory::PriceData, None)
        .await
        .unwrap();
    manager.delete("balance_w1_eth", CacheCategory::Balance).await.unwrap();
    manager.delete("price_abc", CacheCategory::PriceData).await.unwrap();

    assert_eq!(*balance_events.lock(), 1);
    assert_eq!(*all_events.lock(), 2);

    // 注销后不再送达
    assert!(manager.unsubscribe(all_id));
    manager
        .set("balance_w2_eth", json!(1).into(), CacheCategory::Balance, None)
        .await
        .unwrap();
    manager.delete("balance_w2_eth", CacheCategory::Balance).await.unwrap();
    assert_eq!(*all_events.lock(), 2);
    assert_eq!(*balance_events.lock(), 2);
}

#[tokio::test]
async fn test_clear_all_publishes_cleared() {
    let (manager, _, _) = create_tiered_manager();
    manager
        .set("balance_w1_eth", json!(1).into(), CacheCategory::Balance, None)
        .await
        .unwrap();

    let cleared = Arc::new(Mutex::new(false));
    let sink = Arc::clone(&cleared);
    manager.subscribe(
        Arc::new(move |event| {
            if event.reason == InvalidationReason::Cleared {
                *sink.lock() = true;
            }
            Ok(())
        }),
        None,
    );

    manager.clear_all().await;
    assert!(*cleared.lock());
    assert!(manager
        .get("balance_w1_eth", CacheCategory::Balance)
        .await
        .unwrap()
        .is_none());
}
