//! Route specificity ordering.
//!
//! Routes with fewer dynamic segments sort before routes with more; ties
//! break lexicographically. This keeps concrete pages ahead of parameterized
//! ones when the router walks the table in order.

use super::route::PageRoute;

/// Sort routes in place by specificity.
pub fn sort_routes(routes: &mut [PageRoute]) {
    routes.sort_by(|a, b| {
        a.dynamic_segments()
            .cmp(&b.dynamic_segments())
            .then_with(|| a.pathname.as_str().cmp(b.pathname.as_str()))
    });
}
