//! `[build]` section configuration.
//!
//! Filesystem layout and page resolution settings.
//!
//! # Example
//!
//! ```toml
//! [build]
//! pages = "pages"
//! public = "public"
//! output = ".pavo"
//! base_path = "/docs"
//! page_extensions = ["js", "jsx", "ts", "tsx"]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Build layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Pages root (route discovery), relative to the project root.
    pub pages: PathBuf,

    /// Public assets root, relative to the project root.
    pub public: PathBuf,

    /// Build output directory (contains `static/` and `server/`).
    pub output: PathBuf,

    /// Optional path prefix all routes are served under.
    pub base_path: String,

    /// Build identifier used in internal asset URLs.
    pub build_id: String,

    /// Source file extensions that count as pages.
    pub page_extensions: Vec<String>,

    /// Optional compiler command run per page by the command bundler.
    /// `{page}` is substituted with the page pathname.
    pub compile_command: Option<String>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            pages: PathBuf::from("pages"),
            public: PathBuf::from("public"),
            output: PathBuf::from(".pavo"),
            base_path: String::new(),
            build_id: "development".to_string(),
            page_extensions: vec![
                "js".to_string(),
                "jsx".to_string(),
                "ts".to_string(),
                "tsx".to_string(),
            ],
            compile_command: None,
        }
    }
}
