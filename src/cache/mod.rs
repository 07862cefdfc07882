//! Cache Module
//!
//! In-process LFU caching with time-decayed frequency counters and TTL
//! expiration.

mod clock;
mod decay;
mod engine;
mod entry;
mod handle;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use decay::{DecayPipeline, DecayRecord, Tier, TierRole};
pub use engine::LfuEngine;
pub use entry::{CacheEntry, EntryId, Payload};
pub use handle::LfuCache;
pub use stats::CacheStats;
pub use store::FrequencyStore;
