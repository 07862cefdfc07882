//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Lookups that find nothing
//! (absent key, expired entry, wrong value type) are not errors; they surface
//! as `Ok(None)`.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction parameters were rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The executor could not accept or complete a submitted task
    #[error("Executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// The executor worker thread could not be started
    #[error("Failed to spawn executor: {0}")]
    ExecutorSpawn(String),

    /// A previous task panicked while holding the cache state
    #[error("Cache state poisoned by a panicked task")]
    StatePoisoned,
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::InvalidConfig("capacity_limit must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: capacity_limit must be positive"
        );

        let err = CacheError::ExecutorUnavailable("inbox closed".to_string());
        assert_eq!(err.to_string(), "Executor unavailable: inbox closed");

        assert_eq!(
            CacheError::StatePoisoned.to_string(),
            "Cache state poisoned by a panicked task"
        );
    }
}
