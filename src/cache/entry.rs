//! Cache Entry Module
//!
//! Defines individual cache entries: a type-erased payload, the entry's
//! access frequency, an optional expiration instant and its ordering links.

use std::any::Any;
use std::fmt;
use std::time::Instant;

// == Payload ==
/// Opaque stored value, read back through a runtime type check.
pub struct Payload(Box<dyn Any + Send>);

impl Payload {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Returns the value if it was stored as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

// == Entry Id ==
/// Stable handle to an entry slot inside the store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

// == Cache Entry ==
/// A single cache entry with value, frequency and metadata.
#[derive(Debug)]
pub struct CacheEntry {
    /// Key this entry is stored under
    pub key: String,
    /// The stored value
    pub value: Payload,
    /// Access frequency, mirrors the engine's cumulative count for `key`
    pub frequency: i64,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Neighbor toward the head (higher frequency)
    pub(crate) prev: Option<EntryId>,
    /// Neighbor toward the tail (lower frequency)
    pub(crate) next: Option<EntryId>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an unlinked entry.
    ///
    /// # Arguments
    /// * `key` - The key the entry is stored under
    /// * `value` - The value to store
    /// * `frequency` - Starting frequency (residual history or 0)
    /// * `expires_at` - Optional expiration instant
    pub fn new(
        key: impl Into<String>,
        value: Payload,
        frequency: i64,
        expires_at: Option<Instant>,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            frequency,
            expires_at,
            prev: None,
            next: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches the expiration instant, so a TTL
    /// of `T` stops serving the value exactly `T` after it was set.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}
