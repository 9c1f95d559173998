//! Prelude module - Commonly used types for quick imports
//!
//! This module re-exports the most commonly used types from Cacheron,
//! allowing users to import them with a single `use cacheron::prelude::*;`
//! statement instead of importing each type individually.

// Core types - always available
pub use crate::entry::{CacheCategory, CacheTier, CacheValue};
pub use crate::error::{CacheError, TierError};
pub use crate::manager::{TieredCacheManager, TieredCacheManagerBuilder};
pub use crate::policy::{CachePolicy, EvictionStrategy, PolicyRegistry};

// Collaborator tier traits and in-memory doubles
pub use crate::tier::{
    InMemoryPersistentTier, InMemoryRemoteTier, PersistentTierClient, RemoteTierClient,
};

// Invalidation and warming surfaces
pub use crate::invalidation::{InvalidationEvent, InvalidationReason};
pub use crate::prefetch::{FetchFn, WarmOutcome};

// Observability
pub use crate::stats::{DashboardSnapshot, StatsSnapshot};
