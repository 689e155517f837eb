//! Route entries: a matcher plus a handler returning a finished flag.

use tiny_http::Request;

use crate::build::RequestError;
use crate::core::UrlPath;
use crate::page::{RouteMatcher, RouteParams};

/// What a handler did with the request.
pub enum RouteOutcome {
    /// Response sent; dispatch stops.
    Finished,
    /// Not handled; dispatch continues with the request.
    Continue(Request),
    /// Classified failure; the request is handed back unanswered so the
    /// error view can respond.
    Error(Request, RequestError),
}

/// Mutable per-request routing state.
///
/// `original` is the path as received; `stripped` has the configured base
/// path removed. Internal routes match on `stripped`, custom routes on
/// `original`. Rewrites update both; header rules accumulate into
/// `extra_headers` for the eventual response.
pub struct DispatchState {
    pub original: UrlPath,
    pub stripped: UrlPath,
    pub extra_headers: Vec<(String, String)>,
}

/// Match details handed to a handler.
pub struct Matched {
    pub params: RouteParams,
    /// Remainder after a prefix match, without a leading slash.
    pub rest: Option<String>,
}

/// Handlers respond themselves; an `Err` means the response could not be
/// written (the connection is gone), and is only logged.
pub type RouteHandler = Box<
    dyn Fn(Request, &Matched, &mut DispatchState) -> anyhow::Result<RouteOutcome> + Send + Sync,
>;

/// How an entry matches request paths.
pub enum RoutePattern {
    /// Path begins with this prefix at a segment boundary.
    Prefix(String),
    /// Path equals this exactly.
    Exact(String),
    /// Compiled dynamic pattern with named parameters.
    Dynamic(RouteMatcher),
    /// Matches every path.
    All,
}

/// One (matcher, handler) pair in the ordered table.
pub struct Route {
    pub name: &'static str,
    pub pattern: RoutePattern,
    /// Match against the original path instead of the base-stripped one.
    pub match_original: bool,
    pub handler: RouteHandler,
}

impl Route {
    pub fn matches(&self, state: &DispatchState) -> Option<Matched> {
        let candidate = if self.match_original {
            &state.original
        } else {
            &state.stripped
        };

        match &self.pattern {
            RoutePattern::Prefix(prefix) => {
                let rest = candidate.strip_path_prefix(prefix)?;
                Some(Matched {
                    params: RouteParams::default(),
                    rest: Some(rest.as_str().trim_start_matches('/').to_string()),
                })
            }
            RoutePattern::Exact(path) => (candidate == path.as_str()).then(|| Matched {
                params: RouteParams::default(),
                rest: None,
            }),
            RoutePattern::Dynamic(matcher) => matcher.matches(candidate.as_str()).map(|params| {
                Matched { params, rest: None }
            }),
            RoutePattern::All => Some(Matched {
                params: RouteParams::default(),
                rest: None,
            }),
        }
    }
}
