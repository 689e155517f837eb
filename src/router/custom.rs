//! Router entries for configured custom routes.
//!
//! Redirect, rewrite and header rules are consumed read-only. All of them
//! match against the original (base-path-restored) request path, so rules
//! always see the path the browser sent.

use tiny_http::{Header, Response, StatusCode};

use crate::config::RoutesSection;
use crate::core::UrlPath;
use crate::page::{RouteMatcher, RouteParams};

use super::{Route, RouteOutcome, RoutePattern};

/// Build router entries from the configured rule lists, in order:
/// headers, redirects, rewrites.
pub fn custom_routes(section: &RoutesSection, base_path: &str) -> Vec<Route> {
    let mut routes = Vec::new();

    for rule in &section.headers {
        let headers = rule.headers.clone();
        routes.push(Route {
            name: "custom headers",
            pattern: RoutePattern::Dynamic(RouteMatcher::compile(&rule.source)),
            match_original: true,
            handler: Box::new(move |request, _, state| {
                for (name, value) in &headers {
                    state.extra_headers.push((name.clone(), value.clone()));
                }
                Ok(RouteOutcome::Continue(request))
            }),
        });
    }

    for rule in &section.redirects {
        let destination = rule.destination.clone();
        let status = if rule.permanent { 308 } else { 307 };
        routes.push(Route {
            name: "custom redirect",
            pattern: RoutePattern::Dynamic(RouteMatcher::compile(&rule.source)),
            match_original: true,
            handler: Box::new(move |request, matched, _| {
                let target = substitute_params(&destination, &matched.params);
                let location = Header::from_bytes("Location", target.as_bytes())
                    .unwrap_or_else(|_| Header::from_bytes("Location", "/").unwrap());
                let response = Response::empty(StatusCode(status)).with_header(location);
                request.respond(response)?;
                Ok(RouteOutcome::Finished)
            }),
        });
    }

    for rule in &section.rewrites {
        let destination = rule.destination.clone();
        let base_path = base_path.to_string();
        routes.push(Route {
            name: "custom rewrite",
            pattern: RoutePattern::Dynamic(RouteMatcher::compile(&rule.source)),
            match_original: true,
            handler: Box::new(move |request, matched, state| {
                let target = substitute_params(&destination, &matched.params);
                let rewritten = UrlPath::new(&target);
                state.stripped = if base_path.is_empty() {
                    rewritten.clone()
                } else {
                    rewritten
                        .strip_path_prefix(&base_path)
                        .unwrap_or_else(|| rewritten.clone())
                };
                state.original = rewritten;
                Ok(RouteOutcome::Continue(request))
            }),
        });
    }

    routes
}

/// Replace `[param]` and `[...param]` tokens in a destination.
fn substitute_params(destination: &str, params: &RouteParams) -> String {
    let mut out = destination.to_string();
    for (name, value) in params {
        out = out.replace(&format!("[...{name}]"), value);
        out = out.replace(&format!("[{name}]"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    #[test]
    fn test_substitute_params() {
        let mut params = RouteParams::default();
        params.insert("slug".to_string(), "hello".to_string());
        assert_eq!(
            substitute_params("/blog/[slug]", &params),
            "/blog/hello"
        );

        let mut params = RouteParams::default();
        params.insert("rest".to_string(), "a/b".to_string());
        assert_eq!(
            substitute_params("/docs/[...rest]", &params),
            "/docs/a/b"
        );
    }

    #[test]
    fn test_no_rules_no_routes() {
        let config = ProjectConfig::from_str("").unwrap();
        assert!(custom_routes(&config.routes, "").is_empty());
    }

    #[test]
    fn test_rules_build_entries_in_order() {
        let config = ProjectConfig::from_str(
            r#"
[[routes.headers]]
source = "/fonts/[name]"
headers = { Cache-Control = "public" }

[[routes.redirects]]
source = "/old"
destination = "/new"

[[routes.rewrites]]
source = "/api/proxy"
destination = "/api/internal"
"#,
        )
        .unwrap();

        let routes = custom_routes(&config.routes, "");
        let names: Vec<_> = routes.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["custom headers", "custom redirect", "custom rewrite"]
        );
    }
}
