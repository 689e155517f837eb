//! Project configuration (`pavo.toml`).
//!
//! Loaded once at startup and passed explicitly to the components that need
//! it; no ambient config globals.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{BuildSection, RoutesSection, ServeSection, StaticPathsSection};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::log;

/// Config file name looked up in the project root.
pub const CONFIG_FILE: &str = "pavo.toml";

/// Root configuration for a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub serve: ServeSection,
    pub build: BuildSection,
    pub routes: RoutesSection,
    pub static_paths: StaticPathsSection,

    /// Project root directory (set after load, not read from TOML).
    #[serde(skip)]
    root: PathBuf,
}

impl ProjectConfig {
    /// Load configuration for a project root. A missing config file yields
    /// defaults; a malformed one is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config = if path.is_file() {
            Self::from_path(&path)?
        } else {
            Self::default()
        };
        config.root = root.to_path_buf();
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let (config, _) = Self::parse_with_ignored(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            log!("warning"; "unknown fields in {}, ignoring:", CONFIG_FILE);
            for field in &ignored {
                eprintln!("- {field}");
            }
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Pages root (route discovery).
    pub fn pages_dir(&self) -> PathBuf {
        self.root.join(&self.build.pages)
    }

    /// Public assets root.
    pub fn public_dir(&self) -> PathBuf {
        self.root.join(&self.build.public)
    }

    /// Build output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.build.output)
    }

    /// Build output `static/` subdirectory.
    pub fn output_static_dir(&self) -> PathBuf {
        self.output_dir().join("static")
    }

    /// Build output `server/` subdirectory (compiled page bundles).
    pub fn output_server_dir(&self) -> PathBuf {
        self.output_dir().join("server")
    }

    /// Legacy top-level `static/` directory.
    pub fn legacy_static_dir(&self) -> PathBuf {
        self.root.join("static")
    }

    /// Configured base path, or empty. Always without a trailing slash.
    pub fn base_path(&self) -> &str {
        self.build.base_path.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::from_str("").unwrap();
        assert_eq!(config.serve.port, 3000);
        assert!(config.serve.watch);
        assert_eq!(config.build.pages, PathBuf::from("pages"));
        assert_eq!(config.build.page_extensions, vec!["js", "jsx", "ts", "tsx"]);
        assert_eq!(config.static_paths.retries, 1);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_sections_parse() {
        let config = ProjectConfig::from_str(
            r#"
[serve]
port = 8080
watch = false

[build]
base_path = "/docs/"
build_id = "abc123"

[static_paths]
workers = 2
retries = 3

[[routes.redirects]]
source = "/old"
destination = "/new"
permanent = true
"#,
        )
        .unwrap();

        assert_eq!(config.serve.port, 8080);
        assert!(!config.serve.watch);
        assert_eq!(config.base_path(), "/docs");
        assert_eq!(config.build.build_id, "abc123");
        assert_eq!(config.static_paths.workers, 2);
        assert_eq!(config.static_paths.retries, 3);
        assert_eq!(config.routes.redirects.len(), 1);
        assert!(config.routes.redirects[0].permanent);
        assert!(!config.routes.is_empty());
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            ProjectConfig::parse_with_ignored("[serve]\nport = 1234\nbogus = true").unwrap();
        assert_eq!(ignored, vec!["serve.bogus"]);
    }

    #[test]
    fn test_derived_dirs() {
        let mut config = ProjectConfig::from_str("").unwrap();
        config.set_root(Path::new("/proj"));
        assert_eq!(config.pages_dir(), PathBuf::from("/proj/pages"));
        assert_eq!(config.output_static_dir(), PathBuf::from("/proj/.pavo/static"));
        assert_eq!(config.output_server_dir(), PathBuf::from("/proj/.pavo/server"));
        assert_eq!(config.legacy_static_dir(), PathBuf::from("/proj/static"));
    }
}
