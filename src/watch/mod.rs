//! Route watcher
//!
//! Watches the pages root and keeps the route table in sync with the
//! filesystem. Implements the "Watcher-First" pattern: the notify watcher
//! starts buffering events before the bootstrap scan completes, so no
//! change is lost between them.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (pure timing) → rescan → table swap → client notify
//! ```

// Pure timing and deduplication.
mod debouncer;
// Route table, scanning and swap/diff semantics.
mod table;

pub use table::{RouteTable, SharedRouteTable, scan_routes};

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::ProjectConfig;
use debouncer::Debouncer;

/// Receiver of route-table change notifications (connected clients).
pub trait ChangeListener: Send + Sync {
    fn routes_changed(&self, pages: Vec<String>);
}

/// No-op listener for contexts without connected clients.
pub struct NullListener;

impl ChangeListener for NullListener {
    fn routes_changed(&self, _pages: Vec<String>) {}
}

struct WatchHandle {
    // Watcher must be kept alive for events to flow
    _watcher: notify::RecommendedWatcher,
    stop_tx: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

/// Watches the pages root, recomputes the route table on change, and
/// notifies connected clients when the ordered contents differ.
pub struct RouteWatcher {
    config: Arc<ProjectConfig>,
    table: Arc<SharedRouteTable>,
    listener: Arc<dyn ChangeListener>,
    handle: Mutex<Option<WatchHandle>>,
}

impl RouteWatcher {
    pub fn new(
        config: Arc<ProjectConfig>,
        table: Arc<SharedRouteTable>,
        listener: Arc<dyn ChangeListener>,
    ) -> Self {
        Self {
            config,
            table,
            listener,
            handle: Mutex::new(None),
        }
    }

    /// Begin watching the pages root.
    ///
    /// The bootstrap scan runs synchronously; its failure propagates (this
    /// is the only scan allowed to). An empty or missing pages root still
    /// completes readiness with an empty table. Later scans log and keep
    /// the previous table on failure.
    pub fn start(&self) -> Result<()> {
        let pages_dir = self.config.pages_dir();
        let extensions = self.config.build.page_extensions.clone();

        // Watcher first: buffer events while the bootstrap scan runs
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        if pages_dir.is_dir() {
            watcher
                .watch(&pages_dir, RecursiveMode::Recursive)
                .with_context(|| format!("watching {}", pages_dir.display()))?;
        }

        // Bootstrap scan; the swap is silent, no clients are connected yet
        let initial = scan_routes(&pages_dir, &extensions)?;
        crate::debug!("watch"; "bootstrap: {} pages", initial.len());
        self.table.swap(initial);

        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let thread = spawn_watch_loop(
            notify_rx,
            stop_rx,
            pages_dir,
            extensions,
            Arc::clone(&self.table),
            Arc::clone(&self.listener),
        );

        *self.handle.lock() = Some(WatchHandle {
            _watcher: watcher,
            stop_tx,
            thread: Some(thread),
        });
        Ok(())
    }

    /// Tear down the watch handle. Idempotent.
    pub fn stop(&self) {
        let Some(mut handle) = self.handle.lock().take() else {
            return;
        };
        let _ = handle.stop_tx.blocking_send(());
        if let Some(thread) = handle.thread.take() {
            let _ = thread.join();
        }
        crate::debug!("watch"; "stopped");
    }
}

/// Spawn the debounce/rescan loop on its own runtime thread.
fn spawn_watch_loop(
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    mut stop_rx: mpsc::Receiver<()>,
    pages_dir: PathBuf,
    extensions: Vec<String>,
    table: Arc<SharedRouteTable>,
    listener: Arc<dyn ChangeListener>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                crate::log!("watch"; "runtime failed: {}", e);
                return;
            }
        };

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Bridge notify's sync channel into the async loop
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        rt.block_on(async move {
            let mut debouncer = Debouncer::new();
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.recv() => break,
                    Some(event) = async_rx.recv() => debouncer.add_event(&event),
                    _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                        if debouncer.take_if_ready().is_some() {
                            rescan(&pages_dir, &extensions, &table, listener.as_ref());
                        }
                    }
                }
            }
        });
    })
}

/// Recompute the table after a debounced batch.
///
/// A failed scan keeps the previous table; a successful one swaps and
/// fires exactly one notification when the ordered contents changed.
fn rescan(
    pages_dir: &std::path::Path,
    extensions: &[String],
    table: &SharedRouteTable,
    listener: &dyn ChangeListener,
) {
    let new_table = match scan_routes(pages_dir, extensions) {
        Ok(t) => t,
        Err(e) => {
            crate::log!("watch"; "rescan failed, keeping previous routes: {}", e);
            return;
        }
    };

    let count = new_table.len();
    if table.swap(new_table) {
        let pages = table.load().pathnames();
        crate::log!("watch"; "routes updated: {} pages", count);
        listener.routes_changed(pages);
    } else {
        crate::debug!("watch"; "rescan: no route changes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingListener {
        fired: AtomicUsize,
        last: Mutex<Vec<String>>,
    }

    impl CountingListener {
        fn new() -> Self {
            Self {
                fired: AtomicUsize::new(0),
                last: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChangeListener for CountingListener {
        fn routes_changed(&self, pages: Vec<String>) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = pages;
        }
    }

    fn exts() -> Vec<String> {
        vec!["js".into()]
    }

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"export default null\n").unwrap();
    }

    #[test]
    fn test_rescan_notifies_only_on_change() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.js");

        let table = SharedRouteTable::empty();
        let listener = CountingListener::new();

        // First rescan: empty -> [/a], one notification
        rescan(temp.path(), &exts(), &table, &listener);
        assert_eq!(listener.fired.load(Ordering::SeqCst), 1);
        assert_eq!(*listener.last.lock(), vec!["/a".to_string()]);

        // No filesystem change: no re-notification
        rescan(temp.path(), &exts(), &table, &listener);
        assert_eq!(listener.fired.load(Ordering::SeqCst), 1);

        // New page: exactly one more notification
        touch(temp.path(), "b.js");
        rescan(temp.path(), &exts(), &table, &listener);
        assert_eq!(listener.fired.load(Ordering::SeqCst), 2);
        assert_eq!(
            *listener.last.lock(),
            vec!["/a".to_string(), "/b".to_string()]
        );
    }

    #[test]
    fn test_bootstrap_empty_dir_completes() {
        let temp = TempDir::new().unwrap();
        let config = {
            let mut c = crate::config::ProjectConfig::from_str("").unwrap();
            c.set_root(temp.path());
            Arc::new(c)
        };
        let table = Arc::new(SharedRouteTable::empty());
        let watcher = RouteWatcher::new(config, Arc::clone(&table), Arc::new(NullListener));

        // Pages dir does not exist; start still resolves with an empty table
        watcher.start().unwrap();
        assert!(table.load().is_empty());

        watcher.stop();
        // stop() is idempotent
        watcher.stop();
    }
}
