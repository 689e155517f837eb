//! `[[routes.redirects]]` / `[[routes.rewrites]]` / `[[routes.headers]]`
//! section configuration.
//!
//! Custom routes are consumed read-only; the router installs entries for
//! them only when any are configured.
//!
//! # Example
//!
//! ```toml
//! [[routes.redirects]]
//! source = "/old-blog/[slug]"
//! destination = "/blog/[slug]"
//! permanent = true
//!
//! [[routes.rewrites]]
//! source = "/api/proxy"
//! destination = "/api/internal"
//!
//! [[routes.headers]]
//! source = "/fonts/[name]"
//! headers = { Cache-Control = "public, max-age=31536000" }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Custom route rule lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesSection {
    pub redirects: Vec<RedirectRule>,
    pub rewrites: Vec<RewriteRule>,
    pub headers: Vec<HeaderRule>,
}

impl RoutesSection {
    /// True when no custom rules are configured at all.
    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty() && self.rewrites.is_empty() && self.headers.is_empty()
    }
}

/// Redirect `source` to `destination` with 307/308 (permanent) status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectRule {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub permanent: bool,
}

/// Internally rewrite `source` to `destination` before page resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRule {
    pub source: String,
    pub destination: String,
}

/// Attach response headers to requests matching `source`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderRule {
    pub source: String,
    pub headers: BTreeMap<String, String>,
}
