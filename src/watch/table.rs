//! Route table: the sorted set of known page routes.
//!
//! The table is swapped as a whole via `ArcSwap`; readers always observe a
//! fully-formed table, old or new, never a partial one.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use rustc_hash::FxHashSet;

use crate::core::UrlPath;
use crate::page::{PageRoute, pathname_for, sort_routes};

/// Ordered, specificity-sorted sequence of page routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<PageRoute>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<PageRoute>) -> Self {
        sort_routes(&mut routes);
        Self { routes }
    }

    pub fn routes(&self) -> &[PageRoute] {
        &self.routes
    }

    /// Sorted pathnames, as served by the manifest endpoint.
    pub fn pathnames(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| r.pathname.as_str().to_string())
            .collect()
    }

    /// Dynamic subset, in table order.
    pub fn dynamic_routes(&self) -> impl Iterator<Item = &PageRoute> {
        self.routes.iter().filter(|r| r.is_dynamic)
    }

    pub fn contains(&self, pathname: &str) -> bool {
        self.routes.iter().any(|r| r.pathname == pathname)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Ordered-content equality, the basis for change notifications.
    pub fn same_routes(&self, other: &Self) -> bool {
        self.routes.len() == other.routes.len()
            && self
                .routes
                .iter()
                .zip(other.routes.iter())
                .all(|(a, b)| a.pathname == b.pathname)
    }
}

/// Shared holder for the current route table.
///
/// Owned by the watcher; read by the router and the manifest endpoint.
pub struct SharedRouteTable {
    inner: ArcSwap<RouteTable>,
}

impl SharedRouteTable {
    pub fn new(table: RouteTable) -> Self {
        Self {
            inner: ArcSwap::from_pointee(table),
        }
    }

    pub fn empty() -> Self {
        Self::new(RouteTable::default())
    }

    /// Snapshot of the current table.
    pub fn load(&self) -> Arc<RouteTable> {
        self.inner.load_full()
    }

    /// Swap in a new table. Returns whether the ordered contents changed,
    /// compared against the pre-swap table.
    pub fn swap(&self, table: RouteTable) -> bool {
        let previous = self.inner.load();
        let changed = !previous.same_routes(&table);
        self.inner.store(Arc::new(table));
        changed
    }
}

/// Enumerate page files under the pages root and build a sorted table.
///
/// Duplicate pathnames (e.g. `a.js` next to `a.tsx`) keep a single entry.
pub fn scan_routes(pages_dir: &Path, extensions: &[String]) -> Result<RouteTable> {
    let mut routes = Vec::new();
    let mut seen: FxHashSet<UrlPath> = FxHashSet::default();

    if !pages_dir.is_dir() {
        return Ok(RouteTable::default());
    }

    for entry in jwalk::WalkDir::new(pages_dir).sort(true) {
        let entry = entry.with_context(|| format!("walking {}", pages_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(pages_dir) else {
            continue;
        };
        let Some(pathname) = pathname_for(relative, extensions) else {
            continue;
        };
        if seen.insert(pathname.clone()) {
            routes.push(PageRoute::from_pathname(pathname));
        }
    }

    Ok(RouteTable::new(routes))
}
