//! Development server.
//!
//! Composes the route watcher, build coordinator, static-paths
//! coordinator, diagnostics remapper and reload hub into an ordered
//! request pipeline over a `tiny_http` server.

mod assets;
mod lifecycle;
mod page;
mod response;

pub use assets::AssetRoots;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use anyhow::{Context, Result};
use tiny_http::{Request, Server};

use crate::build::{BuildCoordinator, PageComponents, RequestError};
use crate::bundler::{Bundler, RunOutcome};
use crate::config::ProjectConfig;
use crate::core::{ReadyGate, is_shutdown, register_server};
use crate::diagnostics::DiagnosticsRemapper;
use crate::handler::RequestHandler;
use crate::preview::PreviewPropsCache;
use crate::reload::{DEFAULT_WS_PORT, ReloadHub, start_ws_server};
use crate::router::{Dispatch, Route, RouteOutcome, RoutePattern, Router, custom::custom_routes};
use crate::static_paths::{RetryPolicy, StaticPathsCoordinator, StaticPathsLoader};
use crate::watch::{RouteWatcher, SharedRouteTable};

/// Reserved namespace for dev assets served from the build output.
pub const INTERNAL_PREFIX: &str = "/_next/development";

/// Manifest endpoint path for a build id.
fn manifest_path(build_id: &str) -> String {
    format!("/_next/static/{build_id}/_devPagesManifest.json")
}

/// Shared server internals, reachable from route handler closures.
pub struct DevInner {
    pub config: Arc<ProjectConfig>,
    pub bundler: Arc<dyn Bundler>,
    pub table: Arc<SharedRouteTable>,
    pub watcher: RouteWatcher,
    pub build: BuildCoordinator,
    pub static_paths: StaticPathsCoordinator,
    pub remapper: Arc<DiagnosticsRemapper>,
    pub preview: PreviewPropsCache,
    pub hub: Arc<ReloadHub>,
    pub gate: Arc<ReadyGate>,
    pub assets: AssetRoots,
    router: std::sync::OnceLock<Router>,
    ws_port: AtomicU16,
}

impl DevInner {
    fn router(&self) -> &Router {
        self.router
            .get()
            .expect("router generated during construction")
    }

    pub fn ws_port(&self) -> u16 {
        self.ws_port.load(Ordering::Relaxed)
    }
}

/// The development request handler.
pub struct DevServer {
    inner: Arc<DevInner>,
}

impl DevServer {
    pub fn new(
        config: Arc<ProjectConfig>,
        bundler: Arc<dyn Bundler>,
        loader: Arc<dyn StaticPathsLoader>,
    ) -> Result<Self> {
        let gate = Arc::new(ReadyGate::new());
        let table = Arc::new(SharedRouteTable::empty());
        let hub = Arc::new(ReloadHub::new());
        let remapper = Arc::new(DiagnosticsRemapper::new(config.output_dir()));

        let listener: Arc<dyn crate::watch::ChangeListener> = hub.clone();
        let watcher = RouteWatcher::new(Arc::clone(&config), Arc::clone(&table), listener);
        let build = BuildCoordinator::new(
            Arc::clone(&config),
            Arc::clone(&bundler),
            Arc::clone(&gate),
        );
        let static_paths = StaticPathsCoordinator::new(
            loader,
            config.output_dir(),
            config.static_paths.workers,
            RetryPolicy {
                retries: config.static_paths.retries,
            },
        )?;
        let assets = AssetRoots::from_config(&config);

        let inner = Arc::new(DevInner {
            config: Arc::clone(&config),
            bundler,
            table,
            watcher,
            build,
            static_paths,
            remapper,
            preview: PreviewPropsCache::new(),
            hub,
            gate: Arc::clone(&gate),
            assets,
            router: std::sync::OnceLock::new(),
            ws_port: AtomicU16::new(DEFAULT_WS_PORT),
        });

        let router = Router::new(
            Self::build_routes(&inner),
            config.base_path().to_string(),
            gate,
        );
        let _ = inner.router.set(router);

        Ok(Self { inner })
    }

    /// Bring every subsystem up, then open the readiness gate. Requests
    /// accepted earlier block until this completes.
    pub fn start(&self) -> Result<()> {
        self.inner.bundler.start().context("starting bundler")?;
        self.inner.watcher.start().context("starting route watcher")?;

        if let Err(e) = self.inner.build.build_fallback_error() {
            crate::log!("build"; "fallback error build failed: {}", e);
        }

        if self.inner.config.serve.watch {
            match start_ws_server(DEFAULT_WS_PORT, Arc::clone(&self.inner.hub)) {
                Ok(port) => self.inner.ws_port.store(port, Ordering::Relaxed),
                Err(e) => crate::log!("reload"; "websocket server failed: {}", e),
            }
        }

        let overlay: Arc<dyn crate::diagnostics::OverlaySink> = self.inner.hub.clone();
        self.inner.remapper.set_overlay(overlay);
        self.inner.remapper.install_process_hooks();

        self.inner.gate.open();
        Ok(())
    }

    /// Stop the watcher, the worker pool, then the bundler, in order.
    pub fn shutdown(&self) {
        self.inner.watcher.stop();
        // The worker pool drains on drop with the server
        if let Err(e) = self.inner.bundler.stop() {
            crate::log!("build"; "bundler stop failed: {}", e);
        }
    }

    pub fn inner(&self) -> &Arc<DevInner> {
        &self.inner
    }

    /// The ordered route table: dev assets, manifest, custom routes (only
    /// when configured), catch-all public assets. Page render is the
    /// terminal fallback, not an entry.
    fn build_routes(inner: &Arc<DevInner>) -> Vec<Route> {
        let mut routes = Vec::new();

        let i = Arc::clone(inner);
        routes.push(Route {
            name: "development assets",
            pattern: RoutePattern::Prefix(INTERNAL_PREFIX.to_string()),
            match_original: false,
            handler: Box::new(move |request, matched, state| {
                // The internal namespace must stay internal: a public
                // file at the same path is a fatal misconfiguration,
                // distinct from the page/asset conflict below
                if i.assets.resolve_public_asset(&state.stripped).is_some() {
                    return Ok(RouteOutcome::Error(
                        request,
                        RequestError::Conflict(format!(
                            "a public file shadows the internal asset namespace at {}",
                            state.stripped
                        )),
                    ));
                }
                let rest = matched.rest.as_deref().unwrap_or_default();
                match i.assets.resolve_dev_asset(rest) {
                    Some(file) => {
                        response::respond_file(request, &file, &state.extra_headers)?;
                    }
                    None => response::respond_not_found(request)?,
                }
                Ok(RouteOutcome::Finished)
            }),
        });

        let i = Arc::clone(inner);
        routes.push(Route {
            name: "pages manifest",
            pattern: RoutePattern::Exact(manifest_path(&inner.config.build.build_id)),
            match_original: false,
            handler: Box::new(move |request, _, _| {
                let manifest = serde_json::json!({ "pages": i.table.load().pathnames() });
                response::respond_json(request, manifest.to_string())?;
                Ok(RouteOutcome::Finished)
            }),
        });

        if !inner.config.routes.is_empty() {
            routes.extend(custom_routes(
                &inner.config.routes,
                inner.config.base_path(),
            ));
        }

        let i = Arc::clone(inner);
        routes.push(Route {
            name: "catch-all assets",
            pattern: RoutePattern::All,
            match_original: false,
            handler: Box::new(move |request, _, state| {
                let Some(file) = i.assets.resolve_public_asset(&state.stripped) else {
                    // Not an asset; page rendering proceeds downstream
                    return Ok(RouteOutcome::Continue(request));
                };
                if i.build.has_page(state.stripped.as_str()) {
                    return Ok(RouteOutcome::Error(
                        request,
                        RequestError::Conflict(format!(
                            "a page and a public file both resolve to {}",
                            state.stripped
                        )),
                    ));
                }
                response::respond_file(request, &file, &state.extra_headers)?;
                Ok(RouteOutcome::Finished)
            }),
        });

        routes
    }

    /// Handle one request end to end.
    fn handle_request(&self, request: Request) -> Result<()> {
        if is_shutdown() {
            return response::respond_unavailable(request);
        }

        // The bundler's middleware sees requests first
        let request = match self.inner.bundler.run(request)? {
            RunOutcome::Finished => return Ok(()),
            RunOutcome::Continue(request) => request,
        };

        match self.inner.router().dispatch(request)? {
            Dispatch::Finished => Ok(()),
            Dispatch::Unhandled(request, state) => {
                page::render_page(&self.inner, request, &state)
            }
            Dispatch::Errored(request, state, error) => {
                page::respond_error(&self.inner, request, &state, error)
            }
        }
    }
}

impl RequestHandler for DevServer {
    fn generate_routes(&self) -> Vec<Route> {
        Self::build_routes(&self.inner)
    }

    fn has_page(&self, pathname: &str) -> bool {
        self.inner.build.has_page(pathname)
    }

    fn find_page_components(&self, pathname: &str) -> Result<PageComponents, RequestError> {
        self.inner.build.find_page_components(pathname)
    }

    fn run(&self, request: Request) -> Result<()> {
        self.handle_request(request)
    }
}

// =============================================================================
// Request loop
// =============================================================================

/// Bound server ready to accept requests.
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

/// Bind the HTTP server without starting the request loop, so startup can
/// proceed while early requests queue.
pub fn bind_server(config: &ProjectConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, _shutdown_rx) = crossbeam::channel::unbounded::<()>();
    register_server(Arc::clone(&server), shutdown_tx);

    crate::log!("serve"; "http://{}", addr);
    Ok(BoundServer { server, addr })
}

impl BoundServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the request loop (blocking) until shutdown unblocks it.
    pub fn run(self, handler: Arc<DevServer>) -> Result<()> {
        // Thread pool keeps on-demand compilation from blocking other
        // requests
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .context("building request thread pool")?;

        for request in self.server.incoming_requests() {
            let handler = Arc::clone(&handler);
            pool.spawn(move || {
                if let Err(e) = handler.run(request) {
                    crate::log!("serve"; "request error: {e}");
                }
            });
        }

        handler.shutdown();
        Ok(())
    }
}
