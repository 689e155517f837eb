//! Stack frame parsing.
//!
//! Compiled-bundle stack traces arrive as text; only the top frame is
//! remapped. Recognized forms:
//!
//! ```text
//! at renderPage (pages/blog/[slug].js:12:40)
//! at pages/blog/[slug].js:12:40
//! /abs/path/bundle.js:3:7
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// One parsed frame of a compiled stack trace.
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub function: Option<String>,
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

/// A frame resolved back to original source.
#[derive(Debug, Clone)]
pub struct OriginalStackFrame {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub function: Option<String>,
    /// Source lines around the location, when available.
    pub snippet: Option<String>,
}

static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:at\s+)?(?:(?P<func>[^\s(][^(]*?)\s+\()?(?P<file>[^():\s][^():]*):(?P<line>\d+):(?P<col>\d+)\)?\s*$")
        .unwrap()
});

/// Parse a single frame line.
pub fn parse_frame(line: &str) -> Option<StackFrame> {
    let caps = FRAME_RE.captures(line)?;
    Some(StackFrame {
        function: caps.name("func").map(|m| m.as_str().trim().to_string()),
        file: caps.name("file")?.as_str().to_string(),
        line: caps.name("line")?.as_str().parse().ok()?,
        column: caps.name("col")?.as_str().parse().ok()?,
    })
}

/// Find the first parseable frame in a stack text (the top frame).
pub fn parse_top_frame(stack: &str) -> Option<StackFrame> {
    stack.lines().find_map(parse_frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_with_function() {
        let frame = parse_frame("    at renderPage (pages/blog/[slug].js:12:40)").unwrap();
        assert_eq!(frame.function.as_deref(), Some("renderPage"));
        assert_eq!(frame.file, "pages/blog/[slug].js");
        assert_eq!(frame.line, 12);
        assert_eq!(frame.column, 40);
    }

    #[test]
    fn test_frame_without_function() {
        let frame = parse_frame("    at pages/a.js:3:7").unwrap();
        assert_eq!(frame.function, None);
        assert_eq!(frame.file, "pages/a.js");
        assert_eq!(frame.line, 3);
    }

    #[test]
    fn test_bare_location() {
        let frame = parse_frame("/build/server/pages/a.js:3:7").unwrap();
        assert_eq!(frame.file, "/build/server/pages/a.js");
        assert_eq!(frame.column, 7);
    }

    #[test]
    fn test_top_frame_skips_message_lines() {
        let stack = "Error: boom\n    at renderPage (pages/a.js:1:2)\n    at run (pages/b.js:9:9)";
        let frame = parse_top_frame(stack).unwrap();
        assert_eq!(frame.file, "pages/a.js");
    }

    #[test]
    fn test_unparseable_returns_none() {
        assert!(parse_frame("Error: boom").is_none());
        assert!(parse_top_frame("nothing useful here").is_none());
    }
}
