//! Bundler collaborator contract.
//!
//! The bundler owns compilation and the compilation-error registry; the
//! server core only calls through this trait and reads errors back. How
//! compilation actually happens stays behind this boundary.

mod command;

pub use command::{CommandBundler, FALLBACK_ERROR_FILE};

use anyhow::Result;
use thiserror::Error;
use tiny_http::Request;

/// One recorded compilation failure for a page.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BundleError {
    /// Page pathname the error was recorded for.
    pub page: String,
    /// Compiler output describing the failure.
    pub message: String,
}

/// Outcome of offering a request to the bundler's middleware.
pub enum RunOutcome {
    /// The bundler answered the request.
    Finished,
    /// Not a bundler request; the router continues with it.
    Continue(Request),
}

/// External bundler interface consumed by the server core.
pub trait Bundler: Send + Sync {
    /// Start background compilation machinery.
    fn start(&self) -> Result<()>;

    /// Stop background compilation machinery. Idempotent.
    fn stop(&self) -> Result<()>;

    /// Guarantee the page's module graph is compiled. May block for the
    /// duration of compilation.
    fn ensure_page(&self, pathname: &str) -> Result<()>;

    /// Compilation errors currently recorded for a page. Read-only.
    fn compilation_errors(&self, pathname: &str) -> Vec<BundleError>;

    /// Offer a request to bundler middleware (e.g. module reload feeds).
    fn run(&self, request: Request) -> Result<RunOutcome>;

    /// Build the fallback error bundle, available even when the project's
    /// own error page cannot compile.
    fn build_fallback_error(&self) -> Result<()>;
}
