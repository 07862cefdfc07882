//! Configuration Module
//!
//! Construction parameters for a cache instance. The library never reads the
//! environment on its own; `CacheConfig::from_env` exists for the command driver.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Number of decay tiers used when the configured count is below one.
pub const DEFAULT_DECAY_TIER_COUNT: usize = 3;

/// Factor between the capacities (and windows) of adjacent decay tiers.
pub const DECAY_GROWTH_RATE: u32 = 10;

/// Cache construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the store can hold
    pub capacity_limit: usize,
    /// Window after which an access stops counting toward an entry's frequency
    pub base_duration: Duration,
    /// Number of cascading decay tiers
    pub decay_tier_count: usize,
}

impl CacheConfig {
    /// Creates a config with the default number of decay tiers.
    pub fn new(capacity_limit: usize, base_duration: Duration) -> Self {
        Self {
            capacity_limit,
            base_duration,
            decay_tier_count: DEFAULT_DECAY_TIER_COUNT,
        }
    }

    /// Overrides the number of decay tiers.
    pub fn with_decay_tier_count(mut self, decay_tier_count: usize) -> Self {
        self.decay_tier_count = decay_tier_count;
        self
    }

    /// Tier count actually used by the decay pipeline.
    pub fn effective_decay_tier_count(&self) -> usize {
        if self.decay_tier_count >= 1 {
            self.decay_tier_count
        } else {
            DEFAULT_DECAY_TIER_COUNT
        }
    }

    /// Rejects parameters the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity_limit == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity_limit must be positive".to_string(),
            ));
        }
        if self.base_duration.is_zero() {
            return Err(CacheError::InvalidConfig(
                "base_duration must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LFU_CAPACITY_LIMIT` - Maximum cache entries (default: 1000)
    /// - `LFU_BASE_DURATION_SECS` - Decay window in seconds (default: 300)
    /// - `LFU_DECAY_TIERS` - Number of decay tiers (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity_limit: env::var("LFU_CAPACITY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity_limit),
            base_duration: env::var("LFU_BASE_DURATION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.base_duration),
            decay_tier_count: env::var("LFU_DECAY_TIERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.decay_tier_count),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(1000, Duration::from_secs(300))
    }
}
