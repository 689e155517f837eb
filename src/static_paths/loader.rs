//! Worker boundary contract for static pre-render path enumeration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Keep-alive options forwarded to page data fetching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpAgentOptions {
    pub keep_alive: bool,
}

/// Everything a worker invocation needs to enumerate paths for one page.
#[derive(Debug, Clone)]
pub struct StaticPathsRequest {
    pub build_dir: PathBuf,
    pub pathname: String,
    pub is_like_serverless: bool,
    pub runtime_config: serde_json::Value,
    pub http_agent_options: HttpAgentOptions,
    pub locales: Vec<String>,
    pub default_locale: Option<String>,
}

/// Raw worker output: `fallback` is a bool or the string `"blocking"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStaticPaths {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub fallback: FallbackValue,
}

/// Untyped fallback flag as workers report it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FallbackValue {
    Flag(bool),
    Mode(String),
}

impl Default for FallbackValue {
    fn default() -> Self {
        Self::Flag(false)
    }
}

/// Executes static-paths enumeration for one page.
///
/// Implementations run on worker pool threads; a panic counts as a crashed
/// worker and is retried per policy.
pub trait StaticPathsLoader: Send + Sync {
    /// Whether the page exports static paths at all. Pages without them
    /// are never routed through the coordinator.
    fn has_static_paths(&self, pathname: &str) -> bool;

    /// Enumerate static paths for the page.
    fn load(&self, request: &StaticPathsRequest) -> Result<RawStaticPaths>;
}

/// Loads path manifests the compiler writes next to page bundles
/// (`server/pages/<page>.paths.json`).
pub struct DiskLoader {
    server_dir: PathBuf,
}

impl DiskLoader {
    pub fn new(server_dir: PathBuf) -> Self {
        Self { server_dir }
    }

    fn manifest_path(&self, pathname: &str) -> PathBuf {
        let relative = pathname.trim_start_matches('/');
        let file = if relative.is_empty() {
            "index.paths.json".to_string()
        } else {
            format!("{relative}.paths.json")
        };
        self.server_dir.join("pages").join(file)
    }
}

impl StaticPathsLoader for DiskLoader {
    fn has_static_paths(&self, pathname: &str) -> bool {
        self.manifest_path(pathname).is_file()
    }

    fn load(&self, request: &StaticPathsRequest) -> Result<RawStaticPaths> {
        let path = self.manifest_path(&request.pathname);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }
}

#[allow(dead_code)]
fn _assert_object_safe(_: &dyn StaticPathsLoader) {}

/// Build a request for a page using project-level settings.
pub fn request_for(
    build_dir: &Path,
    pathname: &str,
    runtime_config: serde_json::Value,
) -> StaticPathsRequest {
    StaticPathsRequest {
        build_dir: build_dir.to_path_buf(),
        pathname: pathname.to_string(),
        is_like_serverless: false,
        runtime_config,
        http_agent_options: HttpAgentOptions::default(),
        locales: Vec::new(),
        default_locale: None,
    }
}
