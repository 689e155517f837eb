//! Build coordination: page existence, on-demand compilation, component
//! lookup.
//!
//! Sits between the router and the bundler collaborator. Compilation
//! errors recorded by the bundler take precedence over rendering; missing
//! artifacts surface as not-found so callers produce a 404.

mod error;

pub use error::RequestError;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bundler::{Bundler, FALLBACK_ERROR_FILE};
use crate::config::ProjectConfig;
use crate::core::{DecodeError, ReadyGate, UrlPath};

/// Pathname of the standard error page.
pub const ERROR_PAGE: &str = "/_error";

/// Loaded page artifacts handed to the render step.
#[derive(Debug, Clone)]
pub struct PageComponents {
    pub pathname: String,
    /// Compiled page bundle under the build output's `server/pages/`.
    pub bundle: PathBuf,
}

/// Ensures a page's compiled artifacts exist before render.
pub struct BuildCoordinator {
    config: Arc<ProjectConfig>,
    bundler: Arc<dyn Bundler>,
    gate: Arc<ReadyGate>,
}

impl BuildCoordinator {
    pub fn new(
        config: Arc<ProjectConfig>,
        bundler: Arc<dyn Bundler>,
        gate: Arc<ReadyGate>,
    ) -> Self {
        Self {
            config,
            bundler,
            gate,
        }
    }

    /// Does a source file exist for this pathname?
    ///
    /// Never errors: unnormalizable input and missing files both yield
    /// `false`.
    pub fn has_page(&self, pathname: &str) -> bool {
        let Ok(normalized) = normalize_pathname(pathname) else {
            return false;
        };
        resolve_page_file(
            &self.config.pages_dir(),
            &normalized,
            &self.config.build.page_extensions,
        )
        .is_some()
    }

    /// Guarantee the page's module graph is compiled.
    pub fn ensure_page(&self, pathname: &str) -> anyhow::Result<()> {
        self.bundler.ensure_page(pathname)
    }

    /// Locate the compiled components for a page.
    ///
    /// Recorded compilation errors surface (wrapped) before any render
    /// attempt; a missing artifact after a successful ensure is reported as
    /// `PageNotFound`, never re-thrown as an internal failure.
    pub fn find_page_components(&self, pathname: &str) -> Result<PageComponents, RequestError> {
        self.gate.wait();

        let errors = self.bundler.compilation_errors(pathname);
        if !errors.is_empty() {
            return Err(RequestError::Compile {
                page: pathname.to_string(),
                errors,
            });
        }

        if let Err(e) = self.bundler.ensure_page(pathname) {
            // The bundler records errors as it fails; prefer the registry
            // so the overlay shows compiler output
            let errors = self.bundler.compilation_errors(pathname);
            if errors.is_empty() {
                return Err(RequestError::Internal(e));
            }
            return Err(RequestError::Compile {
                page: pathname.to_string(),
                errors,
            });
        }

        let bundle = self.bundle_path(pathname);
        if !bundle.is_file() {
            return Err(RequestError::PageNotFound(pathname.to_string()));
        }

        Ok(PageComponents {
            pathname: pathname.to_string(),
            bundle,
        })
    }

    /// Proactively build the fallback error bundle and the standard error
    /// page, so an error UI is available even when the requested page
    /// cannot build.
    pub fn build_fallback_error(&self) -> anyhow::Result<()> {
        self.bundler.build_fallback_error()?;
        if let Err(e) = self.bundler.ensure_page(ERROR_PAGE) {
            // The fallback artifact covers for a broken project error page
            crate::debug!("build"; "error page build failed: {}", e);
        }
        Ok(())
    }

    /// Compiled artifact path for a pathname.
    pub fn bundle_path(&self, pathname: &str) -> PathBuf {
        let relative = pathname.trim_start_matches('/');
        let file = if relative.is_empty() {
            "index.js".to_string()
        } else {
            format!("{relative}.js")
        };
        self.config.output_server_dir().join("pages").join(file)
    }

    /// The always-available fallback error artifact.
    pub fn fallback_error_artifact(&self) -> PathBuf {
        self.config
            .output_server_dir()
            .join("pages")
            .join(FALLBACK_ERROR_FILE)
    }
}

/// Normalize a request pathname for page lookup.
///
/// Decodes percent-encoding and rejects NUL bytes and traversal segments.
pub fn normalize_pathname(pathname: &str) -> Result<UrlPath, DecodeError> {
    let decoded = UrlPath::from_request(pathname)?;
    if decoded.as_str().contains('\0') || decoded.segments().any(|s| s == "..") {
        return Err(DecodeError {
            path: pathname.to_string(),
        });
    }
    Ok(decoded)
}

/// Search the pages root for a source file matching a pathname, across all
/// configured extensions: `/a` probes `a.{ext}` then `a/index.{ext}`.
pub fn resolve_page_file(
    pages_dir: &Path,
    pathname: &UrlPath,
    extensions: &[String],
) -> Option<PathBuf> {
    let relative = pathname.as_str().trim_start_matches('/');

    for ext in extensions {
        let candidate = if relative.is_empty() {
            pages_dir.join(format!("index.{ext}"))
        } else {
            pages_dir.join(format!("{relative}.{ext}"))
        };
        if candidate.is_file() {
            return Some(candidate);
        }

        if !relative.is_empty() {
            let candidate = pages_dir.join(relative).join(format!("index.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{BundleError, RunOutcome};
    use parking_lot::Mutex;
    use tempfile::TempDir;

    /// In-memory bundler stub for coordinator tests.
    pub(crate) struct StubBundler {
        pub ensured: Mutex<Vec<String>>,
        pub errors: Mutex<Vec<BundleError>>,
        pub fail_ensure: bool,
    }

    impl StubBundler {
        pub fn new() -> Self {
            Self {
                ensured: Mutex::new(Vec::new()),
                errors: Mutex::new(Vec::new()),
                fail_ensure: false,
            }
        }
    }

    impl Bundler for StubBundler {
        fn start(&self) -> anyhow::Result<()> {
            Ok(())
        }
        fn stop(&self) -> anyhow::Result<()> {
            Ok(())
        }
        fn ensure_page(&self, pathname: &str) -> anyhow::Result<()> {
            self.ensured.lock().push(pathname.to_string());
            if self.fail_ensure {
                anyhow::bail!("ensure failed")
            }
            Ok(())
        }
        fn compilation_errors(&self, pathname: &str) -> Vec<BundleError> {
            self.errors
                .lock()
                .iter()
                .filter(|e| e.page == pathname)
                .cloned()
                .collect()
        }
        fn run(&self, request: tiny_http::Request) -> anyhow::Result<RunOutcome> {
            Ok(RunOutcome::Continue(request))
        }
        fn build_fallback_error(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn setup(temp: &TempDir) -> BuildCoordinator {
        let mut config = ProjectConfig::from_str("").unwrap();
        config.set_root(temp.path());
        let gate = Arc::new(ReadyGate::new());
        gate.open();
        BuildCoordinator::new(Arc::new(config), Arc::new(StubBundler::new()), gate)
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"export default null\n").unwrap();
    }

    #[test]
    fn test_has_page_variants() {
        let temp = TempDir::new().unwrap();
        let coordinator = setup(&temp);
        touch(&temp.path().join("pages/a.js"));
        touch(&temp.path().join("pages/b/index.tsx"));
        touch(&temp.path().join("pages/index.js"));

        assert!(coordinator.has_page("/a"));
        assert!(coordinator.has_page("/b"));
        assert!(coordinator.has_page("/"));
        assert!(!coordinator.has_page("/missing"));
    }

    #[test]
    fn test_has_page_unnormalizable_is_false() {
        let temp = TempDir::new().unwrap();
        let coordinator = setup(&temp);

        // Malformed encoding: false, never an error
        assert!(!coordinator.has_page("/%ff"));
        // Dot segments resolve away during normalization; nothing matches
        assert!(!coordinator.has_page("/../etc/passwd"));
    }

    #[test]
    fn test_find_components_prefers_recorded_errors() {
        let temp = TempDir::new().unwrap();
        let mut config = ProjectConfig::from_str("").unwrap();
        config.set_root(temp.path());
        let gate = Arc::new(ReadyGate::new());
        gate.open();

        let stub = StubBundler::new();
        stub.errors.lock().push(BundleError {
            page: "/a".into(),
            message: "syntax error".into(),
        });
        let coordinator = BuildCoordinator::new(Arc::new(config), Arc::new(stub), gate);

        match coordinator.find_page_components("/a") {
            Err(RequestError::Compile { page, errors }) => {
                assert_eq!(page, "/a");
                assert_eq!(errors.len(), 1);
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn test_find_components_missing_bundle_is_not_found() {
        let temp = TempDir::new().unwrap();
        let coordinator = setup(&temp);

        match coordinator.find_page_components("/a") {
            Err(RequestError::PageNotFound(p)) => assert_eq!(p, "/a"),
            other => panic!("expected not-found, got {other:?}"),
        }
    }

    #[test]
    fn test_find_components_loads_bundle() {
        let temp = TempDir::new().unwrap();
        let coordinator = setup(&temp);
        touch(&temp.path().join(".pavo/server/pages/a.js"));

        let components = coordinator.find_page_components("/a").unwrap();
        assert_eq!(components.pathname, "/a");
        assert!(components.bundle.ends_with("server/pages/a.js"));
    }

    #[test]
    fn test_bundle_path_root() {
        let temp = TempDir::new().unwrap();
        let coordinator = setup(&temp);
        assert!(coordinator.bundle_path("/").ends_with("server/pages/index.js"));
        assert!(
            coordinator
                .bundle_path("/blog/[slug]")
                .ends_with("server/pages/blog/[slug].js")
        );
    }

    #[test]
    fn test_normalize_pathname() {
        assert_eq!(normalize_pathname("/a%20b").unwrap().as_str(), "/a b");
        assert!(normalize_pathname("/%ff").is_err());
        assert!(normalize_pathname("/a%00b").is_err());
        // Dot segments are resolved, not rejected; they cannot escape `/`
        assert_eq!(normalize_pathname("/a/../b").unwrap().as_str(), "/b");
        assert_eq!(normalize_pathname("/../x").unwrap().as_str(), "/x");
    }
}
