//! Serial Task Executor
//!
//! A single worker thread draining a FIFO inbox, so at most one task runs at
//! a time and tasks run in submission order.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info};

use crate::error::{CacheError, Result};

/// A unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted jobs one at a time, in submission order.
///
/// Implementations must never run two jobs concurrently; the cache relies on
/// this for exclusive access to its state.
pub trait TaskExecutor: Send + Sync {
    /// Queues `job`. Fails if the executor no longer accepts work.
    fn execute(&self, job: Job) -> Result<()>;
}

// == Serial Executor ==
/// Executor backed by one dedicated, named OS thread.
///
/// Dropping the executor closes its inbox; jobs already queued still run
/// before the worker exits.
pub struct SerialExecutor {
    name: String,
    sender: Option<UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl SerialExecutor {
    /// Spawns a worker thread named `lfu-cache-executor`.
    pub fn new() -> Result<Self> {
        Self::with_name("lfu-cache-executor")
    }

    /// Spawns a worker thread with the given name.
    pub fn with_name(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, mut inbox) = mpsc::unbounded_channel::<Job>();

        let worker_name = name.clone();
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                debug!(executor = %worker_name, "Executor worker started");
                while let Some(job) = inbox.blocking_recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!(executor = %worker_name, "Task panicked; continuing with next task");
                    }
                }
                debug!(executor = %worker_name, "Executor inbox closed");
            })
            .map_err(|e| CacheError::ExecutorSpawn(e.to_string()))?;

        info!(executor = %name, "Serial executor started");
        Ok(Self {
            name,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Shutdown ==
    /// Stops accepting jobs and waits for queued ones to finish.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            // A job dropping the last handle cannot join its own thread
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                error!(executor = %self.name, "Executor worker exited abnormally");
            }
            info!(executor = %self.name, "Serial executor stopped");
        }
    }
}

impl TaskExecutor for SerialExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        let sender = self.sender.as_ref().ok_or_else(|| {
            CacheError::ExecutorUnavailable(format!("executor {} is shut down", self.name))
        })?;
        sender.send(job).map_err(|_| {
            CacheError::ExecutorUnavailable(format!("executor {} stopped accepting tasks", self.name))
        })
    }
}

impl Drop for SerialExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SerialExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialExecutor")
            .field("name", &self.name)
            .field("running", &self.sender.is_some())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_jobs_run_in_submission_order() {
        let executor = SerialExecutor::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = std_mpsc::channel();

        for i in 0..100 {
            let seen = Arc::clone(&seen);
            executor
                .execute(Box::new(move || seen.lock().unwrap().push(i)))
                .unwrap();
        }
        executor.execute(Box::new(move || done_tx.send(()).unwrap())).unwrap();
        done_rx.recv().unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_jobs_run_on_named_worker_thread() {
        let executor = SerialExecutor::with_name("cache-worker-test").unwrap();
        let (tx, rx) = std_mpsc::channel();

        executor
            .execute(Box::new(move || {
                let name = thread::current().name().map(str::to_string);
                tx.send(name).unwrap();
            }))
            .unwrap();

        assert_eq!(rx.recv().unwrap().as_deref(), Some("cache-worker-test"));
        assert_eq!(executor.name(), "cache-worker-test");
    }

    #[test]
    fn test_panicking_job_does_not_stop_worker() {
        let executor = SerialExecutor::new().unwrap();
        let (tx, rx) = std_mpsc::channel();

        executor.execute(Box::new(|| panic!("boom"))).unwrap();
        executor.execute(Box::new(move || tx.send(7).unwrap())).unwrap();

        assert_eq!(rx.recv().unwrap(), 7);
    }

    #[test]
    fn test_shutdown_drains_queue_then_rejects() {
        let mut executor = SerialExecutor::new().unwrap();
        let counter = Arc::new(Mutex::new(0));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            executor
                .execute(Box::new(move || *counter.lock().unwrap() += 1))
                .unwrap();
        }
        executor.shutdown();

        assert_eq!(*counter.lock().unwrap(), 10);
        assert!(matches!(
            executor.execute(Box::new(|| {})),
            Err(CacheError::ExecutorUnavailable(_))
        ));
    }
}
