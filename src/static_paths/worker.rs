//! Worker pool for static-paths enumeration.
//!
//! Keeps path enumeration off the request threads. Jobs are wrapped in
//! `catch_unwind` so a crashing worker never takes the pool down.

use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::{Context, Result};

/// Crash-retry policy for worker invocations.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after a crash before the failure surfaces.
    pub retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: 1 }
    }
}

/// Thread pool executing loader invocations.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("static-paths-{i}"))
            .build()
            .context("building static paths worker pool")?;
        Ok(Self { pool })
    }

    /// Run a job on the pool. The job must not unwind; callers wrap work
    /// in [`run_caught`].
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.pool.spawn(job);
    }
}

/// Execute a closure, converting a panic into `None` (a crashed worker).
pub fn run_caught<T>(job: impl FnOnce() -> T) -> Option<T> {
    catch_unwind(AssertUnwindSafe(job)).ok()
}
