//! Source map parsing and position lookup.
//!
//! Maps are standard JSON source maps; the `mappings` field is decoded
//! lazily per lookup. Segment fields are VLQ deltas `[generated column,
//! source index, source line, source column, name index]`, with columns
//! resetting per generated line and everything else carrying across.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Parsed source map file.
#[derive(Debug, Deserialize)]
pub struct SourceMap {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    mappings: String,
    #[serde(default, rename = "sourcesContent")]
    sources_content: Vec<Option<String>>,
}

/// A generated position resolved to its original source.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginalPosition {
    pub source: String,
    /// 1-based line in the original source.
    pub line: u32,
    /// 1-based column in the original source.
    pub column: u32,
    pub name: Option<String>,
}

impl SourceMap {
    pub fn from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("parsing source map")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Resolve a 1-based generated line/column to an original position.
    ///
    /// Picks the closest mapping segment at or before the column on the
    /// generated line.
    pub fn lookup(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        let target_line = line.checked_sub(1)? as usize;
        let target_column = column.saturating_sub(1) as i64;

        let mut src_index: i64 = 0;
        let mut src_line: i64 = 0;
        let mut src_column: i64 = 0;
        let mut name_index: i64 = 0;

        let mut best: Option<(i64, i64, i64, i64, Option<i64>)> = None;

        for (line_index, group) in self.mappings.split(';').enumerate() {
            if line_index > target_line {
                break;
            }
            let mut gen_column: i64 = 0;

            for segment in group.split(',') {
                if segment.is_empty() {
                    continue;
                }
                let mut fields = VlqDecoder::new(segment);

                let Some(col_delta) = fields.next() else {
                    continue;
                };
                gen_column += col_delta;

                let has_source = if let Some(d) = fields.next() {
                    src_index += d;
                    src_line += fields.next()?;
                    src_column += fields.next()?;
                    true
                } else {
                    false
                };
                let has_name = if let Some(d) = fields.next() {
                    name_index += d;
                    true
                } else {
                    false
                };

                if line_index == target_line && has_source && gen_column <= target_column {
                    let candidate = (
                        gen_column,
                        src_index,
                        src_line,
                        src_column,
                        has_name.then_some(name_index),
                    );
                    if best.is_none_or(|(prev, ..)| gen_column >= prev) {
                        best = Some(candidate);
                    }
                }
            }
        }

        let (_, src_index, src_line, src_column, name_index) = best?;
        let source = self.sources.get(usize::try_from(src_index).ok()?)?.clone();
        Some(OriginalPosition {
            source,
            line: u32::try_from(src_line).ok()? + 1,
            column: u32::try_from(src_column).ok()? + 1,
            name: name_index
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| self.names.get(i).cloned()),
        })
    }

    /// Embedded content for a source, when the compiler included it.
    pub fn source_content(&self, source: &str) -> Option<&str> {
        let index = self.sources.iter().position(|s| s == source)?;
        self.sources_content.get(index)?.as_deref()
    }
}

/// Iterator over VLQ-encoded values in one mapping segment.
struct VlqDecoder<'a> {
    bytes: std::slice::Iter<'a, u8>,
}

impl<'a> VlqDecoder<'a> {
    fn new(segment: &'a str) -> Self {
        Self {
            bytes: segment.as_bytes().iter(),
        }
    }
}

impl Iterator for VlqDecoder<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let mut result: i64 = 0;
        let mut shift = 0u32;

        loop {
            let digit = base64_value(*self.bytes.next()?)?;
            result |= i64::from(digit & 0x1f) << shift;
            shift += 5;
            if digit & 0x20 == 0 {
                break;
            }
        }

        let negative = result & 1 == 1;
        result >>= 1;
        Some(if negative { -result } else { result })
    }
}

fn base64_value(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Map with one segment: generated 1:1 -> src/input.js 1:1, name 0.
    // "AAAAA" decodes to [0, 0, 0, 0, 0].
    const SIMPLE_MAP: &str = r#"{
        "version": 3,
        "sources": ["src/input.js"],
        "names": ["boom"],
        "mappings": "AAAAA",
        "sourcesContent": ["throw new Error('x')\n"]
    }"#;

    #[test]
    fn test_lookup_simple() {
        let map = SourceMap::from_str(SIMPLE_MAP).unwrap();
        let pos = map.lookup(1, 1).unwrap();
        assert_eq!(pos.source, "src/input.js");
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 1);
        assert_eq!(pos.name.as_deref(), Some("boom"));
    }

    #[test]
    fn test_lookup_closest_preceding_segment() {
        // Two segments on line 0: col 0 -> src 0:0, col 8 -> src 2:4
        // "AAAA,QAEI": [0,0,0,0] then [8,0,2,4]
        let map = SourceMap::from_str(
            r#"{"sources": ["a.js"], "names": [], "mappings": "AAAA,QAEI"}"#,
        )
        .unwrap();

        let pos = map.lookup(1, 4).unwrap();
        assert_eq!((pos.line, pos.column), (1, 1));

        let pos = map.lookup(1, 9).unwrap();
        assert_eq!((pos.line, pos.column), (3, 5));
    }

    #[test]
    fn test_lookup_second_line() {
        // Line 0 empty, line 1: [0, 0, 4, 0] -> src line 4
        let map = SourceMap::from_str(
            r#"{"sources": ["a.js"], "names": [], "mappings": ";AAIA"}"#,
        )
        .unwrap();
        let pos = map.lookup(2, 1).unwrap();
        assert_eq!(pos.line, 5);
    }

    #[test]
    fn test_lookup_miss_returns_none() {
        let map = SourceMap::from_str(SIMPLE_MAP).unwrap();
        assert!(map.lookup(99, 1).is_none());
    }

    #[test]
    fn test_source_content() {
        let map = SourceMap::from_str(SIMPLE_MAP).unwrap();
        assert!(map.source_content("src/input.js").unwrap().contains("throw"));
        assert!(map.source_content("missing.js").is_none());
    }

    #[test]
    fn test_malformed_map_is_error() {
        assert!(SourceMap::from_str("not json").is_err());
    }
}
