//! Compiled matchers for dynamic route pathnames.
//!
//! `/blog/[slug]` matches `/blog/hello` extracting `slug = hello`;
//! `/docs/[...path]` matches any depth extracting the remainder.

use regex::Regex;
use rustc_hash::FxHashMap;

/// Pattern plus named-parameter extractor for one dynamic route.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    pathname: String,
    regex: Regex,
    params: Vec<String>,
}

/// Parameters extracted from a matched request path.
pub type RouteParams = FxHashMap<String, String>;

impl RouteMatcher {
    /// Compile a route pathname into a matcher.
    ///
    /// `[param]` segments match one path segment; `[...param]` segments
    /// match the rest of the path. Non-identifier parameter names make the
    /// segment match literally.
    pub fn compile(pathname: &str) -> Self {
        let mut pattern = String::from("^");
        let mut params = Vec::new();

        for segment in pathname.split('/').filter(|s| !s.is_empty()) {
            pattern.push('/');
            match parse_param(segment) {
                Some((name, catch_all)) => {
                    params.push(name.to_string());
                    if catch_all {
                        pattern.push_str(&format!("(?P<{name}>.+)"));
                    } else {
                        pattern.push_str(&format!("(?P<{name}>[^/]+)"));
                    }
                }
                None => pattern.push_str(&regex::escape(segment)),
            }
        }
        if pattern == "^" {
            pattern.push('/');
        }
        pattern.push('$');

        // The pattern is built from escaped literals and fixed capture
        // templates, so compilation cannot fail on valid param names.
        let regex = Regex::new(&pattern)
            .unwrap_or_else(|_| Regex::new(&format!("^{}$", regex::escape(pathname))).unwrap());

        Self {
            pathname: pathname.to_string(),
            regex,
            params,
        }
    }

    /// Route pathname this matcher was compiled from.
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Match a request path, extracting named parameters.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let caps = self.regex.captures(path)?;
        let mut out = RouteParams::default();
        for name in &self.params {
            if let Some(m) = caps.name(name) {
                out.insert(name.clone(), m.as_str().to_string());
            }
        }
        Some(out)
    }
}

/// Parse `[name]` / `[...name]` segments. Returns `(name, is_catch_all)`.
fn parse_param(segment: &str) -> Option<(&str, bool)> {
    let inner = segment.strip_prefix('[')?.strip_suffix(']')?;
    let (name, catch_all) = match inner.strip_prefix("...") {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    if name.is_empty() || !is_ident(name) {
        return None;
    }
    Some((name, catch_all))
}

fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
