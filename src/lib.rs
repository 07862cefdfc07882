//! LFU Cache - an in-process key/value cache
//!
//! Evicts the least frequently used entry, where frequency is an access count
//! that decays over a configurable window, with optional per-entry TTL.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, LfuCache, LfuEngine, ManualClock};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::{SerialExecutor, TaskExecutor};
