//! Static pre-render path coordination.
//!
//! Single-flight dedup over a worker pool: concurrent calls for the same
//! page attach to one pending invocation and all receive the identical
//! result. Results are never cached; a call after resolution re-invokes
//! the worker.

mod loader;
mod worker;

pub use loader::{
    DiskLoader, FallbackValue, HttpAgentOptions, RawStaticPaths, StaticPathsLoader,
    StaticPathsRequest, request_for,
};
pub use worker::{RetryPolicy, WorkerPool};

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam::channel::{Sender, bounded};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;

/// Policy for serving a dynamic path absent from the precomputed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    None,
    Static,
    Blocking,
}

impl FallbackMode {
    /// Exact worker-output mapping: `true` → static, `"blocking"` →
    /// blocking, `false` or anything else → none.
    pub fn from_value(value: &FallbackValue) -> Self {
        match value {
            FallbackValue::Flag(true) => Self::Static,
            FallbackValue::Mode(mode) if mode == "blocking" => Self::Blocking,
            _ => Self::None,
        }
    }
}

/// Enumerated static paths plus the page's fallback policy.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticPathsResult {
    pub paths: Vec<String>,
    pub fallback: FallbackMode,
}

impl StaticPathsResult {
    /// Is the concrete path in the precomputed set?
    pub fn covers(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

#[derive(Debug, Clone, Error)]
pub enum StaticPathsError {
    /// The worker crashed more times than the retry budget allows.
    #[error("static paths worker crashed for {page}")]
    WorkerCrashed { page: String },

    /// The worker reported a failure; surfaces without retry.
    #[error("static paths failed for {page}: {message}")]
    Failed { page: String, message: String },
}

type SharedResult = Result<StaticPathsResult, StaticPathsError>;

struct Inner {
    loader: Arc<dyn StaticPathsLoader>,
    pool: WorkerPool,
    retry: RetryPolicy,
    build_dir: PathBuf,
    runtime_config: serde_json::Value,
    /// Pending invocations by pathname. The guard spans check-then-insert,
    /// so at most one invocation is live per key.
    in_flight: Mutex<FxHashMap<String, Vec<Sender<SharedResult>>>>,
}

/// Coalesced access to static-paths enumeration.
pub struct StaticPathsCoordinator {
    inner: Arc<Inner>,
}

impl StaticPathsCoordinator {
    pub fn new(
        loader: Arc<dyn StaticPathsLoader>,
        build_dir: PathBuf,
        workers: usize,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                loader,
                pool: WorkerPool::new(workers)?,
                retry,
                build_dir,
                runtime_config: serde_json::Value::Null,
                in_flight: Mutex::new(FxHashMap::default()),
            }),
        })
    }

    /// Whether the page participates in static pre-rendering at all.
    pub fn has_static_paths(&self, pathname: &str) -> bool {
        self.inner.loader.has_static_paths(pathname)
    }

    /// Enumerate static paths for a page, attaching to a pending
    /// invocation when one exists. Blocks until the result is available.
    pub fn get_static_paths(&self, pathname: &str) -> SharedResult {
        let (tx, rx) = bounded(1);

        let spawn_invocation = {
            let mut in_flight = self.inner.in_flight.lock();
            match in_flight.get_mut(pathname) {
                Some(waiters) => {
                    waiters.push(tx);
                    false
                }
                None => {
                    in_flight.insert(pathname.to_string(), vec![tx]);
                    true
                }
            }
        };

        if spawn_invocation {
            let inner = Arc::clone(&self.inner);
            let pathname = pathname.to_string();
            self.inner.pool.spawn(move || {
                let result = invoke_with_retry(&inner, &pathname);
                let waiters = inner.in_flight.lock().remove(&pathname);
                if let Some(waiters) = waiters {
                    for waiter in waiters {
                        let _ = waiter.send(result.clone());
                    }
                }
            });
        }

        rx.recv().unwrap_or_else(|_| {
            Err(StaticPathsError::Failed {
                page: pathname.to_string(),
                message: "worker disconnected".to_string(),
            })
        })
    }
}

/// Run the loader, retrying crashed invocations per policy. A worker
/// reporting an error (as opposed to crashing) surfaces without retry.
fn invoke_with_retry(inner: &Inner, pathname: &str) -> SharedResult {
    let request = request_for(&inner.build_dir, pathname, inner.runtime_config.clone());

    let mut attempts = 0u32;
    loop {
        match worker::run_caught(|| inner.loader.load(&request)) {
            Some(Ok(raw)) => {
                return Ok(StaticPathsResult {
                    fallback: FallbackMode::from_value(&raw.fallback),
                    paths: raw.paths,
                });
            }
            Some(Err(e)) => {
                return Err(StaticPathsError::Failed {
                    page: pathname.to_string(),
                    message: format!("{e:#}"),
                });
            }
            None => {
                attempts += 1;
                if attempts > inner.retry.retries {
                    return Err(StaticPathsError::WorkerCrashed {
                        page: pathname.to_string(),
                    });
                }
                crate::log!("worker"; "static paths worker crashed for {}, retrying", pathname);
            }
        }
    }
}
