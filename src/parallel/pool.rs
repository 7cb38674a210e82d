use crate::error::{RecastError, RecastResult};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How a call to [`WorkerPool::shutdown`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownOutcome {
    /// In-flight work drained within the timeout
    Graceful,
    /// The timeout elapsed and in-flight work was cancelled
    Forced,
    /// The pool was already shut down
    AlreadyShutdown,
}

impl fmt::Display for ShutdownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownOutcome::Graceful => write!(f, "graceful"),
            ShutdownOutcome::Forced => write!(f, "forced"),
            ShutdownOutcome::AlreadyShutdown => write!(f, "already shut down"),
        }
    }
}

/// A fixed-size pool of named worker threads.
///
/// Every running job holds a read guard on the pool. Shutdown takes the write
/// guard, so it waits for running jobs; if they do not finish within the
/// timeout the cancellation flag is raised and shutdown waits for them to
/// notice it. Jobs are expected to poll [`WorkerPool::is_cancelled`].
///
/// Shutdown called from one of the pool's own jobs cannot wait for that job,
/// so it cancels right away and the caller of [`WorkerPool::execute`]
/// releases the threads once the job returns.
pub struct WorkerPool {
    size: usize,
    inner: RwLock<Option<rayon::ThreadPool>>,
    closing: AtomicBool,
    cancelled: AtomicBool,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    pub fn new(size: usize, shutdown_timeout: Duration) -> RecastResult<Self> {
        if size == 0 {
            return Err(RecastError::invalid_argument(
                "pool size must be greater than 0",
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|index| format!("recast-worker-{}", index))
            .build()
            .map_err(|e| RecastError::Pool(e.to_string()))?;

        tracing::debug!(size, ?shutdown_timeout, "Created worker pool");

        Ok(Self {
            size,
            inner: RwLock::new(Some(pool)),
            closing: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            shutdown_timeout,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// True once shutdown has started
    pub fn is_shutdown(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// True once a forced shutdown asked running jobs to stop
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Run `op` inside the pool and wait for its result.
    ///
    /// Parallel iterators used by `op` are scheduled on this pool's threads.
    pub fn execute<R, F>(&self, op: F) -> RecastResult<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        if self.is_shutdown() {
            return Err(RecastError::PoolShutdown);
        }

        let guard = self.inner.read();
        let pool = guard.as_ref().ok_or(RecastError::PoolShutdown)?;
        let result = pool.install(op);
        drop(guard);

        // A shutdown requested from inside the job left the threads to us
        if self.is_shutdown()
            && let Some(mut guard) = self.inner.try_write()
            && guard.take().is_some()
        {
            tracing::debug!(size = self.size, "Worker pool released after in-pool shutdown");
        }

        Ok(result)
    }

    /// Stop accepting work and release the threads. Safe to call repeatedly.
    pub fn shutdown(&self) -> ShutdownOutcome {
        if self.closing.swap(true, Ordering::AcqRel) {
            return ShutdownOutcome::AlreadyShutdown;
        }

        // Waiting for the write guard from a worker would wait on ourselves
        if self.on_worker_thread() {
            tracing::warn!("Worker pool shut down from one of its own jobs, cancelling in-flight work");
            self.cancelled.store(true, Ordering::Release);
            return ShutdownOutcome::Forced;
        }

        if let Some(mut guard) = self.inner.try_write_for(self.shutdown_timeout) {
            guard.take();
            tracing::debug!(size = self.size, "Worker pool shut down");
            return ShutdownOutcome::Graceful;
        }

        tracing::warn!(
            timeout = ?self.shutdown_timeout,
            "Worker pool did not drain in time, cancelling in-flight work"
        );
        self.cancelled.store(true, Ordering::Release);
        self.inner.write().take();
        ShutdownOutcome::Forced
    }

    fn on_worker_thread(&self) -> bool {
        self.inner
            .read_recursive()
            .as_ref()
            .is_some_and(|pool| pool.current_thread_index().is_some())
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("shutdown", &self.is_shutdown())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_rejects_zero_size() {
        assert!(matches!(
            WorkerPool::new(0, Duration::from_secs(1)),
            Err(RecastError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_runs_on_named_workers() {
        let pool = WorkerPool::new(3, Duration::from_secs(1)).unwrap();
        let names: Vec<String> = pool
            .execute(|| {
                (0..32)
                    .into_par_iter()
                    .map(|_| std::thread::current().name().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap();
        assert!(names.iter().all(|name| name.starts_with("recast-worker-")));
        assert_eq!(pool.execute(rayon::current_num_threads).unwrap(), 3);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = WorkerPool::new(2, Duration::from_secs(1)).unwrap();
        assert_eq!(pool.shutdown(), ShutdownOutcome::Graceful);
        assert_eq!(pool.shutdown(), ShutdownOutcome::AlreadyShutdown);
        assert!(pool.is_shutdown());
        assert!(!pool.is_cancelled());
        assert!(matches!(pool.execute(|| 1), Err(RecastError::PoolShutdown)));
    }

    #[test]
    fn test_forced_shutdown_cancels_running_job() {
        let pool = Arc::new(WorkerPool::new(1, Duration::from_millis(50)).unwrap());
        let started = Arc::new(AtomicBool::new(false));
        let polls = Arc::new(AtomicUsize::new(0));

        let job = {
            let pool = pool.clone();
            let started = started.clone();
            let polls = polls.clone();
            std::thread::spawn(move || {
                pool.execute(|| {
                    started.store(true, Ordering::SeqCst);
                    while !pool.is_cancelled() {
                        polls.fetch_add(1, Ordering::Relaxed);
                        std::thread::sleep(Duration::from_millis(5));
                    }
                })
            })
        };

        while !started.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        let begin = Instant::now();
        assert_eq!(pool.shutdown(), ShutdownOutcome::Forced);
        assert!(begin.elapsed() >= Duration::from_millis(50));
        assert!(job.join().unwrap().is_ok());
        assert!(pool.is_cancelled());
        assert!(polls.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_shutdown_from_inside_a_job() {
        let pool = WorkerPool::new(2, Duration::from_secs(5)).unwrap();

        let begin = Instant::now();
        let outcome = pool.execute(|| pool.shutdown()).unwrap();
        assert_eq!(outcome, ShutdownOutcome::Forced);
        assert!(begin.elapsed() < Duration::from_secs(5));

        assert!(pool.is_cancelled());
        assert!(pool.inner.read().is_none());
        assert_eq!(pool.shutdown(), ShutdownOutcome::AlreadyShutdown);
        assert!(matches!(pool.execute(|| 1), Err(RecastError::PoolShutdown)));
    }
}
