//! Cache Handle Module
//!
//! `LfuCache` runs every operation as one task on a `TaskExecutor`. Each
//! operation has a blocking form and an `_async` form; both submit the same
//! task and differ only in how the caller waits for its result.

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::cache::{CacheStats, Clock, LfuEngine, SystemClock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{SerialExecutor, TaskExecutor};

/// Pending result of a submitted task.
type Pending<R> = oneshot::Receiver<Result<R>>;

// == LFU Cache ==
/// Executor-serialized LFU cache.
///
/// Clones share the same engine and executor. The blocking methods must not
/// be called from inside an async runtime; use the `_async` forms there.
#[derive(Clone)]
pub struct LfuCache {
    engine: Arc<Mutex<LfuEngine>>,
    executor: Arc<dyn TaskExecutor>,
}

impl LfuCache {
    // == Constructors ==
    /// Creates a cache with its own dedicated executor thread.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_executor(config, Arc::new(SerialExecutor::new()?))
    }

    /// Creates a cache running on a caller-supplied executor.
    pub fn with_executor(config: CacheConfig, executor: Arc<dyn TaskExecutor>) -> Result<Self> {
        Self::with_parts(config, executor, Arc::new(SystemClock))
    }

    /// Creates a cache with an explicit executor and time source.
    pub fn with_parts(
        config: CacheConfig,
        executor: Arc<dyn TaskExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let engine = LfuEngine::with_clock(&config, clock)?;
        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            executor,
        })
    }

    // == Submission ==
    fn submit<R, F>(&self, task: F) -> Result<Pending<R>>
    where
        R: Send + 'static,
        F: FnOnce(&mut LfuEngine) -> R + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let (tx, rx) = oneshot::channel();

        self.executor.execute(Box::new(move || {
            // Uncontended: the executor runs one task at a time
            let outcome = match engine.lock() {
                Ok(mut guard) => Ok(task(&mut guard)),
                Err(_) => Err(CacheError::StatePoisoned),
            };
            let _ = tx.send(outcome);
        }))?;

        Ok(rx)
    }

    fn wait<R>(pending: Pending<R>) -> Result<R> {
        pending.blocking_recv().map_err(|_| dropped_task())?
    }

    async fn wait_async<R>(pending: Pending<R>) -> Result<R> {
        pending.await.map_err(|_| dropped_task())?
    }

    // == Blocking Operations ==
    /// Stores a value without expiration.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread driving a Tokio runtime; use
    /// `set_async` there.
    pub fn set<V: Any + Send>(&self, key: impl Into<String>, value: V) -> Result<()> {
        self.setex(key, value, Duration::ZERO)
    }

    /// Stores a value that expires after `ttl` (zero = never).
    ///
    /// # Panics
    ///
    /// Panics when called from a thread driving a Tokio runtime; use
    /// `setex_async` there.
    pub fn setex<V: Any + Send>(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
    ) -> Result<()> {
        let key = key.into();
        Self::wait(self.submit(move |engine| engine.setex(key, value, ttl))?)
    }

    /// Retrieves a value stored as `T`; absent, expired and mistyped values
    /// all read as `None`. Counts as an access either way.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread driving a Tokio runtime; use
    /// `get_async` there.
    pub fn get<T: Any + Clone + Send>(&self, key: impl Into<String>) -> Result<Option<T>> {
        let key = key.into();
        Self::wait(self.submit(move |engine| engine.get::<T>(&key))?)
    }

    /// Removes an entry, returning whether one was present.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread driving a Tokio runtime; use
    /// `delete_async` there.
    pub fn delete(&self, key: impl Into<String>) -> Result<bool> {
        let key = key.into();
        Self::wait(self.submit(move |engine| engine.delete(&key))?)
    }

    /// Number of stored entries.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread driving a Tokio runtime; use
    /// `len_async` there.
    pub fn len(&self) -> Result<usize> {
        Self::wait(self.submit(|engine| engine.len())?)
    }

    /// # Panics
    ///
    /// Same as [`LfuCache::len`].
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of the cache counters.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread driving a Tokio runtime; use
    /// `stats_async` there.
    pub fn stats(&self) -> Result<CacheStats> {
        Self::wait(self.submit(|engine| engine.stats())?)
    }

    // == Async Operations ==
    pub async fn set_async<V: Any + Send>(&self, key: impl Into<String>, value: V) -> Result<()> {
        self.setex_async(key, value, Duration::ZERO).await
    }

    pub async fn setex_async<V: Any + Send>(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
    ) -> Result<()> {
        let key = key.into();
        let pending = self.submit(move |engine| engine.setex(key, value, ttl))?;
        Self::wait_async(pending).await
    }

    pub async fn get_async<T: Any + Clone + Send>(
        &self,
        key: impl Into<String>,
    ) -> Result<Option<T>> {
        let key = key.into();
        let pending = self.submit(move |engine| engine.get::<T>(&key))?;
        Self::wait_async(pending).await
    }

    pub async fn delete_async(&self, key: impl Into<String>) -> Result<bool> {
        let key = key.into();
        let pending = self.submit(move |engine| engine.delete(&key))?;
        Self::wait_async(pending).await
    }

    pub async fn len_async(&self) -> Result<usize> {
        let pending = self.submit(|engine| engine.len())?;
        Self::wait_async(pending).await
    }

    pub async fn stats_async(&self) -> Result<CacheStats> {
        let pending = self.submit(|engine| engine.stats())?;
        Self::wait_async(pending).await
    }
}

impl std::fmt::Debug for LfuCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LfuCache").finish_non_exhaustive()
    }
}

fn dropped_task() -> CacheError {
    CacheError::ExecutorUnavailable("task was dropped before completing".to_string())
}
