//! 淘汰引擎集成测试
//!
//! 测试场景：
//! 1. 容量不变式在顺序与并发写入下都成立
//! 2. LRU/LFU/TTL策略的受害者选择
//! 3. 自适应容量随命中率收缩

use crate::common::create_fast_only_manager;
use cacheron::{CacheCategory, CachePolicy, CacheTier, EvictionStrategy};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn small_policy(strategy: EvictionStrategy, max_entries: usize) -> CachePolicy {
    CachePolicy::new(CacheCategory::PriceData, strategy)
        .ttl(Duration::from_secs(600))
        .max_entries(max_entries)
        .tiers(vec![CacheTier::Fast])
}

#[tokio::test]
async fn test_capacity_invariant_sequential() {
    let manager = create_fast_only_manager();
    manager
        .set_policy(small_policy(EvictionStrategy::Lru, 10))
        .unwrap();

    for i in 0..50 {
        manager
            .set(&format!("price_seq_{}", i), json!(i).into(), CacheCategory::PriceData, None)
            .await
            .unwrap();
        let dashboard = manager.get_dashboard();
        assert!(
            dashboard.entry_counts["price"] <= dashboard.adaptive_sizes["price"].current_size
        );
    }
    assert!(manager.get_stats().evictions >= 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_invariant_concurrent() {
    let manager = create_fast_only_manager();
    manager
        .set_policy(small_policy(EvictionStrategy::Lru, 10))
        .unwrap();

    let mut handles = Vec::new();
    for task in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                manager
                    .set(
                        &format!("price_t{}_{}", task, i),
                        json!(i).into(),
                        CacheCategory::PriceData,
                        None,
                    )
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let dashboard = manager.get_dashboard();
    assert!(dashboard.entry_counts["price"] <= dashboard.adaptive_sizes["price"].current_size);
    assert!(manager.get_stats().evictions > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_capacity_invariant_barrier_released_sets() {
    let manager = create_fast_only_manager();
    manager
        .set_policy(small_policy(EvictionStrategy::Lru, 4))
        .unwrap();

    // 每轮8个set在栅栏处同时放行，容量检查与插入的交错被放大
    for round in 0..200 {
        let barrier = Arc::new(tokio::sync::Barrier::new(8));
        let mut handles = Vec::new();
        for task in 0..8 {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                manager
                    .set(
                        &format!("price_r{}_t{}", round, task),
                        json!(task).into(),
                        CacheCategory::PriceData,
                        None,
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let dashboard = manager.get_dashboard();
        assert!(
            dashboard.entry_counts["price"] <= dashboard.adaptive_sizes["price"].current_size,
            "第{}轮容量不变式被破坏: {} > {}",
            round,
            dashboard.entry_counts["price"],
            dashboard.adaptive_sizes["price"].current_size
        );
    }
}

#[tokio::test]
async fn test_lru_evicts_least_recently_used() {
    let manager = create_fast_only_manager();
    manager
        .set_policy(small_policy(EvictionStrategy::Lru, 3))
        .unwrap();

    for key in ["price_a", "price_b", "price_c"] {
        manager
            .set(key, json!(1).into(), CacheCategory::PriceData, None)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // 触达price_a使price_b成为最久未访问
    manager.get("price_a", CacheCategory::PriceData).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    manager
        .set("price_d", json!(1).into(), CacheCategory::PriceData, None)
        .await
        .unwrap();

    assert!(manager.get("price_b", CacheCategory::PriceData).await.unwrap().is_none());
    assert!(manager.get("price_a", CacheCategory::PriceData).await.unwrap().is_some());
    assert!(manager.get("price_c", CacheCategory::PriceData).await.unwrap().is_some());
    assert!(manager.get("price_d", CacheCategory::PriceData).await.unwrap().is_some());
}

#[tokio::test]
async fn test_lfu_evicts_least_frequently_used() {
    let manager = create_fast_only_manager();
    manager
        .set_policy(small_policy(EvictionStrategy::Lfu, 3))
        .unwrap();

    for key in ["price_a", "price_b", "price_c"] {
        manager
            .set(key, json!(1).into(), CacheCategory::PriceData, None)
            .await
            .unwrap();
    }
    // price_a与price_c各访问两次，price_b零次
    for _ in 0..2 {
        manager.get("price_a", CacheCategory::PriceData).await.unwrap();
        manager.get("price_c", CacheCategory::PriceData).await.unwrap();
    }

    manager
        .set("price_d", json!(1).into(), CacheCategory::PriceData, None)
        .await
        .unwrap();

    assert!(manager.get("price_b", CacheCategory::PriceData).await.unwrap().is_none());
    assert!(manager.get("price_a", CacheCategory::PriceData).await.unwrap().is_some());
}

#[tokio::test]
async fn test_ttl_strategy_evicts_soonest_expiring() {
    let manager = create_fast_only_manager();
    manager
        .set_policy(small_policy(EvictionStrategy::Ttl, 3))
        .unwrap();

    manager
        .set(
            "price_long",
            json!(1).into(),
            CacheCategory::PriceData,
            Some(Duration::from_secs(3600)),
        )
        .await
        .unwrap();
    manager
        .set(
            "price_short",
            json!(1).into(),
            CacheCategory::PriceData,
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    manager
        .set(
            "price_mid",
            json!(1).into(),
            CacheCategory::PriceData,
            Some(Duration::from_secs(600)),
        )
        .await
        .unwrap();

    manager
        .set("price_new", json!(1).into(), CacheCategory::PriceData, None)
        .await
        .unwrap();

    // 最先到期的price_short被淘汰
    assert!(manager.get("price_short", CacheCategory::PriceData).await.unwrap().is_none());
    assert!(manager.get("price_long", CacheCategory::PriceData).await.unwrap().is_some());
    assert!(manager.get("price_mid", CacheCategory::PriceData).await.unwrap().is_some());
}

#[tokio::test]
async fn test_adaptive_bounds_hold_under_churn() {
    let manager = create_fast_only_manager();
    let policy = CachePolicy::new(CacheCategory::PriceData, EvictionStrategy::Adaptive)
        .ttl(Duration::from_secs(600))
        .max_entries(20)
        .tiers(vec![CacheTier::Fast]);
    manager.set_policy(policy).unwrap();

    for i in 0..100 {
        manager
            .set(&format!("price_churn_{}", i), json!(i).into(), CacheCategory::PriceData, None)
            .await
            .unwrap();
        if i % 3 == 0 {
            manager
                .get(&format!("price_churn_{}", i), CacheCategory::PriceData)
                .await
                .unwrap();
        }
        let dashboard = manager.get_dashboard();
        let state = &dashboard.adaptive_sizes["price"];
        assert!(state.min_size <= state.current_size);
        assert!(state.current_size <= state.max_size);
        assert!(state.max_size <= 20);
    }
}
