//! `[static_paths]` section configuration.
//!
//! Worker pool sizing and crash-retry policy for static pre-render path
//! enumeration.

use serde::{Deserialize, Serialize};

/// Static-paths worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticPathsSection {
    /// Worker threads enumerating static paths.
    pub workers: usize,

    /// Retries after a crashed worker before the failure surfaces.
    pub retries: u32,
}

impl Default for StaticPathsSection {
    fn default() -> Self {
        Self {
            workers: 4,
            retries: 1,
        }
    }
}
