//! Request error taxonomy.
//!
//! Variants map to response classes: not-found (404, never logged as a
//! failure), compilation (build-error page, logged once by the bundler),
//! decode (400), conflict (500, always logged), internal (500).

use thiserror::Error;

use crate::bundler::BundleError;
use crate::core::DecodeError;

#[derive(Debug, Error)]
pub enum RequestError {
    /// Missing page or asset. An ordinary 404.
    #[error("no such page: {0}")]
    PageNotFound(String),

    /// Compilation errors recorded by the bundler. Wrapping them here
    /// keeps higher layers from logging the compiler output a second time.
    #[error("compilation failed for {page}")]
    Compile {
        page: String,
        errors: Vec<BundleError>,
    },

    /// Malformed percent-encoding in the request path.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A public asset and a page resolve to the same pathname, or the
    /// internal asset namespace collides with a public asset.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RequestError {
    /// HTTP status this error class responds with.
    pub fn status(&self) -> u16 {
        match self {
            Self::PageNotFound(_) => 404,
            Self::Decode(_) => 400,
            Self::Compile { .. } | Self::Conflict(_) | Self::Internal(_) => 500,
        }
    }
}
