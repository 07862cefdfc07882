//! Cache Statistics Module
//!
//! Tracks hits, misses and the different ways entries leave the store.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of reads that returned a value
    pub hits: u64,
    /// Number of reads that returned nothing (absent, expired or wrong type)
    pub misses: u64,
    /// Entries evicted from the tail to respect the capacity limit
    pub evictions: u64,
    /// Entries removed because their frequency decayed to zero
    pub decay_evictions: u64,
    /// Entries removed lazily after their TTL elapsed
    pub expirations: u64,
    /// Times the terminal decay tier overflowed before records expired
    pub saturation_warnings: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Current number of keys with a cumulative frequency
    pub tracked_keys: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_decay_eviction(&mut self) {
        self.decay_evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }
}
