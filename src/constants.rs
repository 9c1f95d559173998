//! Copyright (c) 2026, Kirky.X
//!
//! MIT License
//!
//! Centralized configuration constants for Cacheron.
//!
//! This module provides well-documented constants used throughout the library.
//! All magic numbers are defined here with their purpose and usage context.

// ============================================================================
// Fast Tier Constants
// ============================================================================

/// Number of stripes in the per-key lock table.
///
/// Concurrent `set` calls on the same key serialize on the stripe selected by
/// `hash(key) % LOCK_STRIPES`. Must be a power of two.
pub const LOCK_STRIPES: usize = 64;

/// Default TTL for cache entries when a category policy does not override it
/// (5 minutes).
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default per-category capacity when a category policy does not override it.
pub const DEFAULT_MAX_ENTRIES: usize = 1_000;

// ============================================================================
// Adaptive Sizing Constants
// ============================================================================

/// Default lower bound for a category's adaptive capacity.
pub const DEFAULT_ADAPTIVE_MIN_SIZE: usize = 64;

/// Default growth factor applied on write pressure. Must be > 1.
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.1;

/// Default shrink factor applied by the low-hit-rate sweep. Must be < 1.
pub const DEFAULT_SHRINK_FACTOR: f64 = 0.9;

/// Hit rate below which the maintenance sweep shrinks a category's capacity.
pub const ADAPTIVE_SHRINK_HIT_RATE: f64 = 0.2;

// ============================================================================
// Eviction Constants
// ============================================================================

/// Idle-time weight of the adaptive eviction score (per second idle).
///
/// Adaptive score = `ADAPTIVE_IDLE_WEIGHT * idle_secs
/// - ADAPTIVE_FREQUENCY_WEIGHT * access_count`; the entry with the highest
/// score is evicted, ties broken by the lexicographically smallest key.
pub const ADAPTIVE_IDLE_WEIGHT: f64 = 1.0;

/// Access-frequency weight of the adaptive eviction score (per access).
pub const ADAPTIVE_FREQUENCY_WEIGHT: f64 = 2.0;

// ============================================================================
// Prefetch Constants
// ============================================================================

/// Default number of concurrent prefetch workers.
///
/// Bounds outbound fetch concurrency to provide backpressure against the
/// external data source.
pub const DEFAULT_PREFETCH_WORKERS: usize = 4;

/// Delay between sequential fetches within a single prefetch worker (10 ms).
pub const PREFETCH_INTER_CALL_DELAY_MS: u64 = 10;

// ============================================================================
// Maintenance Constants
// ============================================================================

/// Default interval of the background maintenance sweep (1 minute).
///
/// The sweep eagerly removes TTL-expired Fast-tier entries and applies the
/// low-hit-rate adaptive shrink.
pub const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 60;

/// Window used by the "entries expiring soon" dashboard gauge (5 minutes).
pub const EXPIRING_SOON_WINDOW_SECS: u64 = 300;
