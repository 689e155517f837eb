//! Page render fallback and error views.
//!
//! Not a router entry: requests that no entry finished fall through here.
//! Resolves the pathname against the route table, consults the
//! static-paths coordinator for dynamic pages, ensures compilation, then
//! responds with the page document.

use anyhow::anyhow;
use tiny_http::Request;

use crate::build::{PageComponents, RequestError, normalize_pathname};
use crate::core::UrlPath;
use crate::page::RouteParams;
use crate::router::DispatchState;
use crate::static_paths::FallbackMode;
use crate::utils::html::escape;
use crate::watch::RouteTable;

use super::{DevInner, INTERNAL_PREFIX, response};

/// Terminal fallback: render the page for an unhandled request.
pub fn render_page(inner: &DevInner, request: Request, state: &DispatchState) -> anyhow::Result<()> {
    let preview = is_preview_request(inner, &request);
    match try_render(inner, state, preview) {
        Ok(html) => response::respond_html(request, 200, html, &state.extra_headers),
        Err(error) => respond_error(inner, request, state, error),
    }
}

/// Preview mode bypasses precomputed static output. The gate is the
/// per-process bypass cookie carrying the preview mode id.
fn is_preview_request(inner: &DevInner, request: &Request) -> bool {
    let expected = format!(
        "__prerender_bypass={}",
        inner.preview.get().preview_mode_id
    );
    request
        .headers()
        .iter()
        .filter(|h| h.field.as_str().as_str().eq_ignore_ascii_case("cookie"))
        .any(|h| h.value.as_str().contains(&expected))
}

/// Respond for a request error, classifying per taxonomy. Building the
/// error view happens before the request is consumed, so a failure there
/// still produces a plain-text 500.
pub fn respond_error(
    inner: &DevInner,
    request: Request,
    state: &DispatchState,
    error: RequestError,
) -> anyhow::Result<()> {
    inner.remapper.report_request_error(&error);

    match &error {
        RequestError::PageNotFound(_) => response::respond_not_found(request),
        RequestError::Decode(_) => response::respond_plain(request, 400, "400 Bad Request"),
        _ => match error_document(inner, &error) {
            Ok(html) => {
                response::respond_html(request, error.status(), html, &state.extra_headers)
            }
            // An error while already handling an error: plain 500
            Err(_) => response::respond_plain(request, 500, "500 Internal Server Error"),
        },
    }
}

fn try_render(
    inner: &DevInner,
    state: &DispatchState,
    preview: bool,
) -> Result<String, RequestError> {
    let pathname = normalize_pathname(state.stripped.as_str())?;

    let table = inner.table.load();
    let (page, params) = resolve_route(&table, &pathname)?;

    let is_dynamic = page != pathname.as_str();
    if is_dynamic && !preview && inner.static_paths.has_static_paths(&page) {
        let result = inner
            .static_paths
            .get_static_paths(&page)
            .map_err(|e| RequestError::Internal(anyhow!(e)))?;
        if !result.covers(pathname.as_str()) && result.fallback == FallbackMode::None {
            return Err(RequestError::PageNotFound(pathname.to_string()));
        }
    }

    let components = inner.build.find_page_components(&page)?;
    Ok(page_document(inner, &components, &pathname, &params))
}

/// Find the page answering a concrete pathname: an exact entry first,
/// then the dynamic matchers in table order.
fn resolve_route(
    table: &RouteTable,
    pathname: &UrlPath,
) -> Result<(String, RouteParams), RequestError> {
    if table.contains(pathname.as_str()) {
        return Ok((pathname.as_str().to_string(), RouteParams::default()));
    }

    for route in table.dynamic_routes() {
        if let Some(params) = route
            .matcher
            .as_ref()
            .and_then(|m| m.matches(pathname.as_str()))
        {
            return Ok((route.pathname.as_str().to_string(), params));
        }
    }

    Err(RequestError::PageNotFound(pathname.to_string()))
}

/// The served page document: mount point, page data, bundle and reload
/// client scripts.
fn page_document(
    inner: &DevInner,
    components: &PageComponents,
    pathname: &UrlPath,
    params: &RouteParams,
) -> String {
    let base = inner.config.base_path();
    let bundle_rel = components.pathname.trim_start_matches('/');
    let bundle_src = if bundle_rel.is_empty() {
        format!("{base}{INTERNAL_PREFIX}/server/pages/index.js")
    } else {
        format!("{base}{INTERNAL_PREFIX}/server/pages/{bundle_rel}.js")
    };

    let data = serde_json::json!({
        "page": components.pathname,
        "pathname": pathname.as_str(),
        "params": params,
    });

    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<div id=\"__pavo\"></div>\n<script>window.__PAVO_DATA__ = {data}</script>\n<script src=\"{bundle}\" defer></script>\n{reload}\n</body>\n</html>\n",
        title = escape(pathname.as_str()),
        data = data,
        bundle = escape(&bundle_src),
        reload = reload_script(inner),
    )
}

/// Error view for compile and internal errors.
fn error_document(inner: &DevInner, error: &RequestError) -> anyhow::Result<String> {
    let (heading, detail) = match error {
        RequestError::Compile { page, errors } => {
            let mut detail = String::new();
            for e in errors {
                detail.push_str(&e.message);
                detail.push('\n');
            }
            (format!("Compilation Error in {page}"), detail)
        }
        RequestError::Conflict(message) => {
            ("Conflicting Paths".to_string(), message.clone())
        }
        other => ("Internal Server Error".to_string(), format!("{other:#}")),
    };

    Ok(format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<pre>{detail}</pre>\n{reload}\n</body>\n</html>\n",
        title = escape(&heading),
        detail = escape(detail.trim_end()),
        reload = reload_script(inner),
    ))
}

/// Inline reload client: reconnects to the notification channel and
/// reloads on route changes; diagnostics land on the console.
fn reload_script(inner: &DevInner) -> String {
    let port = inner.ws_port();
    format!(
        "<script>\n(function () {{\n  var ws = new WebSocket('ws://localhost:{port}');\n  ws.onmessage = function (msg) {{\n    var data = JSON.parse(msg.data);\n    if (data.event === 'routesChanged') location.reload();\n    if (data.event === 'diagnostic') console.error(data.diagnostic.message);\n  }};\n}})();\n</script>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageRoute;

    fn table(paths: &[&str]) -> RouteTable {
        RouteTable::new(
            paths
                .iter()
                .map(|p| PageRoute::from_pathname(UrlPath::new(p)))
                .collect(),
        )
    }

    #[test]
    fn test_resolve_exact_route() {
        let table = table(&["/a", "/[id]"]);
        let (page, params) = resolve_route(&table, &UrlPath::new("/a")).unwrap();
        assert_eq!(page, "/a");
        assert!(params.is_empty());
    }

    #[test]
    fn test_resolve_dynamic_route() {
        let table = table(&["/a", "/[id]"]);
        let (page, params) = resolve_route(&table, &UrlPath::new("/42")).unwrap();
        assert_eq!(page, "/[id]");
        assert_eq!(params["id"], "42");
    }

    #[test]
    fn test_resolve_prefers_static_entry() {
        // Table order puts static entries first; `/a` must not be
        // captured by `/[id]`
        let table = table(&["/[id]", "/a"]);
        let (page, _) = resolve_route(&table, &UrlPath::new("/a")).unwrap();
        assert_eq!(page, "/a");
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let table = table(&["/a/b"]);
        assert!(matches!(
            resolve_route(&table, &UrlPath::new("/zzz/x")),
            Err(RequestError::PageNotFound(_))
        ));
    }
}
