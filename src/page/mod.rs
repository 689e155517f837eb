//! Page routes: pathname derivation, dynamic matchers, specificity order.

pub mod matcher;
pub mod route;
pub mod sort;

pub use matcher::{RouteMatcher, RouteParams};
pub use route::{PageRoute, is_dynamic_pathname, pathname_for};
pub use sort::sort_routes;
