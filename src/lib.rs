//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Cacheron - Tiered Cache Engine for Chain-Derived Data
//!
//! Provides a three-tier cache (in-process fast tier, shared remote tier,
//! persistent tier) with per-category policies, adaptive sizing, eviction,
//! invalidation propagation, and prefetch warming.
//!
//! # API Layers
//!
//! ## Prelude (Quick Start)
//!
//! Use `use cacheron::prelude::*;` to import all commonly used types.
//!
//! ## Core API
//!
//! - [`TieredCacheManager`] - Facade over all tiers and subsystems
//! - [`CachePolicy`] / [`PolicyRegistry`] - Per-category cache policies
//! - [`CacheCategory`] / [`CacheValue`] - Data model
//! - [`CacheError`] - Error types
//!
//! ## Tier Clients
//!
//! The remote and persistent tiers are pluggable behind the
//! [`RemoteTierClient`] and [`PersistentTierClient`] traits. In-memory
//! implementations are provided for embedding and testing.
//!
//! ## Subsystems
//!
//! Eviction strategies (LRU / LFU / TTL / adaptive), adaptive per-category
//! sizing, an invalidation bus with dependency tracking and cross-chain
//! fan-out, and a bounded-concurrency prefetch coordinator.
//!
//! # Examples
//!
//! ```rust
//! use cacheron::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = TieredCacheManager::builder().build();
//!
//!     cache
//!         .set("balance_w1_eth", json!("100").into(), CacheCategory::Balance, None)
//!         .await
//!         .unwrap();
//!     let value = cache.get("balance_w1_eth", CacheCategory::Balance).await.unwrap();
//!     assert!(value.is_some());
//! }
//! ```
//!
//! # Features
//!
//! - **Read-through tiering**: Fast -> Remote -> Persistent cascade with hit promotion
//! - **Per-category policies**: TTL, capacity, tiers, and eviction strategy per data category
//! - **Adaptive sizing**: capacity targets grow with write pressure and shrink on poor hit rates
//! - **Invalidation**: explicit, pattern, dependency, and cross-chain propagation with subscriber callbacks
//! - **Prefetch warming**: bounded worker pool with cancellation
//! - **Degraded operation**: collaborator tier failures read as misses, never as errors

pub mod prelude;

pub mod adaptive;
pub mod constants;
pub mod entry;
pub mod entry_store;
pub mod error;
pub mod eviction;
pub mod invalidation;
pub mod manager;
pub mod policy;
pub mod prefetch;
pub mod stats;
pub mod tier;

// 重新导出常用类型
pub use adaptive::{AdaptiveSizeState, AdaptiveSizer, SizeDirection};
pub use entry::{CacheCategory, CacheEntry, CacheTier, CacheValue};
pub use entry_store::{EntryStore, EvictionCandidate, FastRead};
pub use error::{CacheError, IntegrityReport, IntegrityViolation, TierError};
pub use eviction::EvictionEngine;
pub use invalidation::{
    CacheDependency, InvalidationBus, InvalidationCallback, InvalidationEvent, InvalidationReason,
};
pub use manager::{HealthReport, TierHealth, TieredCacheManager, TieredCacheManagerBuilder};
pub use policy::{CachePolicy, EvictionStrategy, PolicyFile, PolicyRegistry};
pub use prefetch::{FetchFn, PrefetchCoordinator, WarmOutcome};
pub use stats::{CategoryStats, DashboardSnapshot, StatsCollector, StatsSnapshot};
pub use tier::{
    InMemoryPersistentTier, InMemoryRemoteTier, PersistentTierClient, RemoteTierClient,
};
