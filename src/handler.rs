//! Request handler capability.
//!
//! The dev implementation composes the watcher and coordinators; a
//! production implementation composes a disjoint, simpler set. No shared
//! base state.

use tiny_http::Request;

use crate::build::{PageComponents, RequestError};
use crate::router::Route;

pub trait RequestHandler: Send + Sync {
    /// Build the ordered route entries this handler serves.
    fn generate_routes(&self) -> Vec<Route>;

    /// Does a source file exist for this pathname? Never errors.
    fn has_page(&self, pathname: &str) -> bool;

    /// Locate compiled page artifacts, compiling on demand.
    fn find_page_components(&self, pathname: &str) -> Result<PageComponents, RequestError>;

    /// Handle one request end to end.
    fn run(&self, request: Request) -> anyhow::Result<()>;
}
