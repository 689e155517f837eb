//! Ordered request routing.
//!
//! Walks route entries in priority order: internal dev-asset route,
//! manifest route, custom routes, catch-all. An unhandled request falls
//! through to the page-render terminal fallback with its accumulated
//! dispatch state.

pub mod custom;
mod entry;

pub use entry::{DispatchState, Matched, Route, RouteHandler, RouteOutcome, RoutePattern};

use std::sync::Arc;

use tiny_http::Request;

use crate::build::RequestError;
use crate::core::{ReadyGate, UrlPath};

/// Result of walking the route table.
pub enum Dispatch {
    /// Some entry answered the request.
    Finished,
    /// No entry finished; the page-render fallback takes over.
    Unhandled(Request, DispatchState),
    /// An entry classified a failure; the error view responds.
    Errored(Request, DispatchState, RequestError),
}

pub struct Router {
    routes: Vec<Route>,
    base_path: String,
    gate: Arc<ReadyGate>,
}

impl Router {
    pub fn new(routes: Vec<Route>, base_path: impl Into<String>, gate: Arc<ReadyGate>) -> Self {
        Self {
            routes,
            base_path: base_path.into(),
            gate,
        }
    }

    /// Dispatch one request through the route table.
    ///
    /// Blocks on the readiness barrier first; requests arriving before
    /// bootstrap completes suspend until it opens.
    ///
    /// An `Err` means a handler could not write its response; the request
    /// is gone and the failure is only loggable.
    pub fn dispatch(&self, request: Request) -> anyhow::Result<Dispatch> {
        self.gate.wait();

        let original = match UrlPath::from_request(request.url()) {
            Ok(path) => path,
            Err(e) => {
                let state = DispatchState {
                    original: UrlPath::default(),
                    stripped: UrlPath::default(),
                    extra_headers: Vec::new(),
                };
                return Ok(Dispatch::Errored(request, state, RequestError::Decode(e)));
            }
        };
        let stripped = if self.base_path.is_empty() {
            original.clone()
        } else {
            original
                .strip_path_prefix(&self.base_path)
                .unwrap_or_else(|| original.clone())
        };

        let mut state = DispatchState {
            original,
            stripped,
            extra_headers: Vec::new(),
        };

        let mut request = request;
        for route in &self.routes {
            let Some(matched) = route.matches(&state) else {
                continue;
            };
            crate::debug!("serve"; "{} matched {}", route.name, state.original);
            match (route.handler)(request, &matched, &mut state)? {
                RouteOutcome::Finished => return Ok(Dispatch::Finished),
                RouteOutcome::Continue(r) => request = r,
                RouteOutcome::Error(r, error) => {
                    return Ok(Dispatch::Errored(r, state, error));
                }
            }
        }

        Ok(Dispatch::Unhandled(request, state))
    }
}
