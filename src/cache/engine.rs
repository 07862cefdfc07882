//! Cache Engine Module
//!
//! Orchestrates the frequency-ordered store, the decay pipeline and the
//! cumulative frequency map. The engine does no locking of its own: callers
//! must serialize access, which `LfuCache` does through a `TaskExecutor`.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, Clock, DecayPipeline, FrequencyStore, Payload, SystemClock,
};
use crate::config::CacheConfig;
use crate::error::Result;

// == LFU Engine ==
/// Single-owner LFU cache state.
///
/// A key's cumulative frequency outlives its entry: after a delete, eviction
/// or expiration the count stays in the map until the decay pipeline settles
/// it to zero, so a quick re-insert keeps its rank.
#[derive(Debug)]
pub struct LfuEngine {
    store: FrequencyStore,
    pipeline: DecayPipeline,
    /// Running access count per key, independent of entry lifetime
    frequencies: HashMap<String, i64>,
    capacity_limit: usize,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl LfuEngine {
    // == Constructor ==
    /// Creates an engine reading wall-clock time.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an engine reading time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let pipeline = DecayPipeline::new(
            config.capacity_limit,
            config.base_duration,
            config.effective_decay_tier_count(),
            clock.now(),
        );

        Ok(Self {
            store: FrequencyStore::new(),
            pipeline,
            frequencies: HashMap::new(),
            capacity_limit: config.capacity_limit,
            clock,
            stats: CacheStats::new(),
        })
    }

    // == Set ==
    /// Stores a value without expiration.
    pub fn set<V: Any + Send>(&mut self, key: impl Into<String>, value: V) {
        self.setex(key, value, Duration::ZERO);
    }

    // == Set With Expiration ==
    /// Stores a value that stops being served `ttl` from now.
    ///
    /// A zero `ttl` means no expiration, and so does one too large to
    /// represent as an instant. Updating an existing key replaces value and
    /// expiration but leaves its frequency and position alone.
    pub fn setex<V: Any + Send>(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        self.setex_payload(key.into(), Payload::new(value), ttl);
    }

    fn setex_payload(&mut self, key: String, value: Payload, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            now.checked_add(ttl)
        };

        match self.store.id_of(&key).and_then(|id| self.store.get_mut(id)) {
            Some(entry) => {
                entry.value = value;
                entry.expires_at = expires_at;
            }
            None => {
                let frequency = self.frequencies.get(&key).copied().unwrap_or(0);
                self.store
                    .insert(CacheEntry::new(key.clone(), value, frequency, expires_at));
            }
        }

        // Registers the key with the decay pipeline even if it is never read
        self.add_count(&key, 0);

        if self.store.len() > self.capacity_limit {
            if let Some(evicted) = self.store.evict_tail() {
                self.stats.record_eviction();
                debug!(
                    key = %evicted.key,
                    frequency = evicted.frequency,
                    "Evicted lowest-frequency entry"
                );
            }
        }
    }

    // == Get ==
    /// Retrieves a value stored as `T`.
    ///
    /// Every call counts as an access, whether or not anything is found.
    /// Expired entries are removed on the spot. A value stored under a
    /// different type reads as absent.
    pub fn get<T: Any + Clone>(&mut self, key: &str) -> Option<T> {
        let value = self.lookup(key, |payload| payload.downcast_ref::<T>().cloned());
        self.add_count(key, 1);
        value
    }

    /// Checks presence and expiration, then maps the payload with `read`.
    fn lookup<R>(&mut self, key: &str, read: impl FnOnce(&Payload) -> Option<R>) -> Option<R> {
        let now = self.clock.now();

        let Some(id) = self.store.id_of(key) else {
            self.stats.record_miss();
            return None;
        };

        let expired = self
            .store
            .get(id)
            .map_or(true, |entry| entry.is_expired(now));
        if expired {
            self.store.remove(id);
            self.stats.record_expiration();
            self.stats.record_miss();
            debug!(key = %key, "Removed expired entry");
            return None;
        }

        let value = self.store.get(id).and_then(|entry| read(&entry.value));
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    // == Delete ==
    /// Removes the entry for `key`, keeping its cumulative frequency.
    ///
    /// Returns whether an entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.store.remove_key(key).is_some()
    }

    // == Add Count ==
    /// Registers an access of `amount` for `key`.
    ///
    /// The record enters the decay pipeline (whose settled output is applied
    /// first), the cumulative count rises immediately, and a present entry
    /// moves toward the head.
    fn add_count(&mut self, key: &str, amount: i64) {
        let now = self.clock.now();
        for record in self.pipeline.record_increment(key, amount, now) {
            self.reduce_count(&record.key, record.delta);
        }

        let count = self.frequencies.entry(key.to_string()).or_insert(0);
        *count += amount;
        let frequency = *count;

        if amount > 0 {
            if let Some(id) = self.store.id_of(key) {
                self.store.promote(id, frequency);
            }
        }
    }

    // == Reduce Count ==
    /// Applies a settled decrement from the decay pipeline.
    ///
    /// A count that reaches zero drops the key from the frequency map and
    /// evicts its entry.
    fn reduce_count(&mut self, key: &str, amount: i64) {
        let Some(count) = self.frequencies.get_mut(key) else {
            return;
        };

        let remaining = *count - amount;
        if remaining <= 0 {
            self.frequencies.remove(key);
            if self.store.remove_key(key).is_some() {
                self.stats.record_decay_eviction();
                debug!(key = %key, "Evicted entry whose frequency decayed to zero");
            }
            return;
        }

        *count = remaining;
        if let Some(id) = self.store.id_of(key) {
            self.store.demote(id, remaining);
        }
    }

    // == Introspection ==
    /// Returns the current number of entries in the store.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// True if an entry is stored for `key`, expired or not. Does not count
    /// as an access.
    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    /// Cumulative frequency for `key`, present even after its entry left.
    pub fn frequency_of(&self, key: &str) -> Option<i64> {
        self.frequencies.get(key).copied()
    }

    /// Frequency recorded on the stored entry for `key`.
    pub fn entry_frequency(&self, key: &str) -> Option<i64> {
        self.store
            .id_of(key)
            .and_then(|id| self.store.get(id))
            .map(|entry| entry.frequency)
    }

    /// Key that the next capacity eviction would remove.
    pub fn eviction_candidate(&self) -> Option<&str> {
        self.store.tail_key()
    }

    /// Stored keys from most to least frequent.
    pub fn ordered_keys(&self) -> Vec<String> {
        self.store.keys()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.store.len();
        stats.tracked_keys = self.frequencies.len();
        stats.saturation_warnings = self.pipeline.saturation_warnings();
        stats
    }
}
