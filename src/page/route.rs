//! Page route - source file to pathname mapping.

use std::path::Path;

use crate::core::UrlPath;

use super::matcher::RouteMatcher;

/// A routable page derived from one source file under the pages root.
///
/// # Example
///
/// ```text
/// Source: pages/blog/[slug]/index.tsx
///
/// PageRoute {
///     pathname:   /blog/[slug]
///     is_dynamic: true
///     matcher:    Some(^/blog/(?P<slug>[^/]+)$)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PageRoute {
    /// Route pathname (e.g. `/blog/[slug]`)
    pub pathname: UrlPath,
    /// Whether the pathname contains parameter segments
    pub is_dynamic: bool,
    /// Compiled matcher for dynamic routes
    pub matcher: Option<RouteMatcher>,
}

impl PageRoute {
    /// Build a route from a source path relative to the pages root.
    ///
    /// Returns `None` when the file's extension is not a page extension.
    /// The pathname is the relative path with the extension stripped and a
    /// trailing `index` segment collapsed to the parent; the pages root
    /// itself becomes `/`.
    pub fn from_relative_file(relative: &Path, extensions: &[String]) -> Option<Self> {
        let pathname = pathname_for(relative, extensions)?;
        Some(Self::from_pathname(pathname))
    }

    /// Build a route from an already-derived pathname.
    pub fn from_pathname(pathname: UrlPath) -> Self {
        let is_dynamic = is_dynamic_pathname(pathname.as_str());
        let matcher = is_dynamic.then(|| RouteMatcher::compile(pathname.as_str()));
        Self {
            pathname,
            is_dynamic,
            matcher,
        }
    }

    /// Number of parameter segments, used for specificity sorting.
    pub fn dynamic_segments(&self) -> usize {
        count_dynamic_segments(self.pathname.as_str())
    }
}

/// Does the pathname contain any `[param]` segment?
pub fn is_dynamic_pathname(pathname: &str) -> bool {
    count_dynamic_segments(pathname) > 0
}

fn count_dynamic_segments(pathname: &str) -> usize {
    pathname
        .split('/')
        .filter(|s| s.starts_with('[') && s.ends_with(']') && s.len() > 2)
        .count()
}

/// Derive a pathname from a page file path relative to the pages root.
///
/// `a.js` -> `/a`, `b/index.js` -> `/b`, `index.js` -> `/`.
/// Returns `None` for files without a configured page extension.
pub fn pathname_for(relative: &Path, extensions: &[String]) -> Option<UrlPath> {
    let ext = relative.extension().and_then(|e| e.to_str())?;
    if !extensions.iter().any(|e| e == ext) {
        return None;
    }

    let stem = relative.with_extension("");
    let mut segments: Vec<String> = stem
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    // Collapse a trailing index segment to the parent
    if segments.last().is_some_and(|s| s == "index") {
        segments.pop();
    }

    if segments.is_empty() {
        return Some(UrlPath::new("/"));
    }
    Some(UrlPath::new(&format!("/{}", segments.join("/"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn exts() -> Vec<String> {
        vec!["js".into(), "jsx".into(), "ts".into(), "tsx".into()]
    }

    #[test]
    fn test_pathname_strips_extension() {
        let p = pathname_for(&PathBuf::from("a.js"), &exts()).unwrap();
        assert_eq!(p.as_str(), "/a");
    }

    #[test]
    fn test_pathname_collapses_index() {
        let p = pathname_for(&PathBuf::from("b/index.js"), &exts()).unwrap();
        assert_eq!(p.as_str(), "/b");
    }

    #[test]
    fn test_pathname_root_index() {
        let p = pathname_for(&PathBuf::from("index.tsx"), &exts()).unwrap();
        assert_eq!(p.as_str(), "/");
    }

    #[test]
    fn test_pathname_nested() {
        let p = pathname_for(&PathBuf::from("blog/[slug]/comments.ts"), &exts()).unwrap();
        assert_eq!(p.as_str(), "/blog/[slug]/comments");
    }

    #[test]
    fn test_non_page_extension_skipped() {
        assert!(pathname_for(&PathBuf::from("style.css"), &exts()).is_none());
        assert!(pathname_for(&PathBuf::from("README"), &exts()).is_none());
    }

    #[test]
    fn test_route_dynamic_flag() {
        let route =
            PageRoute::from_relative_file(&PathBuf::from("[id].js"), &exts()).unwrap();
        assert!(route.is_dynamic);
        assert!(route.matcher.is_some());
        assert_eq!(route.dynamic_segments(), 1);

        let route = PageRoute::from_relative_file(&PathBuf::from("a.js"), &exts()).unwrap();
        assert!(!route.is_dynamic);
        assert!(route.matcher.is_none());
    }
}
