//! Diagnostics remapping and error reporting.
//!
//! Every error (per-request render failures, background task failures,
//! process-level panics) funnels through one remap-and-log routine that
//! tries to translate the top compiled stack frame back to original
//! source. The remap path never throws: any failure inside it falls back
//! to logging the raw stack.

mod frames;
mod source_map;

pub use frames::{OriginalStackFrame, StackFrame, parse_frame, parse_top_frame};
pub use source_map::{OriginalPosition, SourceMap};

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::build::RequestError;

/// Prefix for process-level panics.
const UNCAUGHT_PREFIX: &str = "uncaughtException:";
/// Prefix for failures of detached background work.
const REJECTION_PREFIX: &str = "unhandledRejection:";

/// Diagnostic pushed to connected clients for overlay display.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayDiagnostic {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Overlay display capability, resolved at most once and memoized.
pub trait OverlaySink: Send + Sync {
    fn publish(&self, diagnostic: &OverlayDiagnostic);
}

/// Remaps compiled stack frames to original source for console and
/// overlay display.
pub struct DiagnosticsRemapper {
    /// Build output directory; bundle-internal module identifiers resolve
    /// to maps under its `server/` subdirectory.
    output_dir: PathBuf,
    overlay: OnceLock<Arc<dyn OverlaySink>>,
}

impl DiagnosticsRemapper {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            overlay: OnceLock::new(),
        }
    }

    /// Resolve the overlay capability. Later calls are ignored.
    pub fn set_overlay(&self, sink: Arc<dyn OverlaySink>) {
        let _ = self.overlay.set(sink);
    }

    /// Install process-level capture. A panicking request thread is
    /// logged and unwound; the server keeps running.
    pub fn install_process_hooks(self: &Arc<Self>) {
        let remapper = Arc::clone(self);
        std::panic::set_hook(Box::new(move |info| {
            let payload = panic_message(info);
            let location = info
                .location()
                .map(|l| format!("\n    at {}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_default();
            remapper.remap_and_log(UNCAUGHT_PREFIX, &format!("{payload}{location}"));
        }));
    }

    /// Report a per-request error (no prefix).
    pub fn report_request_error(&self, error: &RequestError) {
        match error {
            // Ordinary 404s are not failures
            RequestError::PageNotFound(_) => {}
            // The bundler already recorded and reported compiler output;
            // re-logging it here would duplicate it
            RequestError::Compile { page, errors } => {
                self.publish_overlay(&OverlayDiagnostic {
                    message: format!(
                        "compilation failed for {page} ({} error{})",
                        errors.len(),
                        if errors.len() == 1 { "" } else { "s" }
                    ),
                    file: None,
                    line: None,
                    column: None,
                    snippet: None,
                });
            }
            other => self.remap_and_log("", &format!("{other:#}")),
        }
    }

    /// Report a failure of detached background work.
    pub fn report_background_error(&self, error: &anyhow::Error) {
        self.remap_and_log(REJECTION_PREFIX, &format!("{error:#}"));
    }

    /// Remap the top frame of `text` and log the result. Never fails;
    /// a broken remap path logs the raw text instead.
    pub fn remap_and_log(&self, prefix: &str, text: &str) {
        let remapped = parse_top_frame(text).and_then(|frame| self.remap_frame(&frame));

        let rendered = match &remapped {
            Some(original) => {
                let mut out = format!(
                    "{}\n    at {} ({}:{}:{})",
                    first_line(text),
                    original.function.as_deref().unwrap_or("<anonymous>"),
                    original.file,
                    original.line,
                    original.column
                );
                if let Some(snippet) = &original.snippet {
                    out.push('\n');
                    out.push_str(snippet);
                }
                out
            }
            None => text.to_string(),
        };

        if prefix.is_empty() {
            crate::log!("error"; "{}", rendered);
        } else {
            crate::log!("error"; "{} {}", prefix, rendered);
        }

        self.publish_overlay(&OverlayDiagnostic {
            message: first_line(text).to_string(),
            file: remapped.as_ref().map(|f| f.file.clone()),
            line: remapped.as_ref().map(|f| f.line),
            column: remapped.as_ref().map(|f| f.column),
            snippet: remapped.and_then(|f| f.snippet),
        });
    }

    /// Translate one compiled frame to original source.
    ///
    /// On-disk absolute paths look up the sibling `<file>.map`;
    /// bundle-internal identifiers look up under the output `server/`
    /// directory. Any failure yields `None`.
    pub fn remap_frame(&self, frame: &StackFrame) -> Option<OriginalStackFrame> {
        let file_path = Path::new(&frame.file);
        let map_path = if file_path.is_absolute() {
            PathBuf::from(format!("{}.map", frame.file))
        } else {
            self.output_dir
                .join("server")
                .join(format!("{}.map", frame.file))
        };

        let map = SourceMap::from_file(&map_path).ok()?;
        let position = map.lookup(frame.line, frame.column)?;
        let snippet = self.snippet_for(&map, &position);

        Some(OriginalStackFrame {
            function: position.name.clone().or_else(|| frame.function.clone()),
            file: position.source,
            line: position.line,
            column: position.column,
            snippet,
        })
    }

    /// Source lines around the original location, from embedded content
    /// or disk.
    fn snippet_for(&self, map: &SourceMap, position: &OriginalPosition) -> Option<String> {
        let content = match map.source_content(&position.source) {
            Some(content) => content.to_string(),
            None => {
                let path = Path::new(&position.source);
                let resolved = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.output_dir.join("server").join(path)
                };
                std::fs::read_to_string(resolved).ok()?
            }
        };
        render_snippet(&content, position.line)
    }

    fn publish_overlay(&self, diagnostic: &OverlayDiagnostic) {
        if let Some(sink) = self.overlay.get() {
            sink.publish(diagnostic);
        }
    }
}

/// Format ±3 lines of context with a marker on the error line.
fn render_snippet(content: &str, line: u32) -> Option<String> {
    let line = line as usize;
    let lines: Vec<&str> = content.lines().collect();
    if line == 0 || line > lines.len() {
        return None;
    }

    let start = line.saturating_sub(4);
    let end = (line + 3).min(lines.len());

    let mut out = String::new();
    for (index, text) in lines.iter().enumerate().take(end).skip(start) {
        let number = index + 1;
        let marker = if number == line { ">" } else { " " };
        out.push_str(&format!("{marker} {number:>4} | {text}\n"));
    }
    Some(out.trim_end_matches('\n').to_string())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

fn panic_message(info: &std::panic::PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    struct CapturingSink {
        seen: Mutex<Vec<OverlayDiagnostic>>,
    }

    impl OverlaySink for CapturingSink {
        fn publish(&self, diagnostic: &OverlayDiagnostic) {
            self.seen.lock().push(diagnostic.clone());
        }
    }

    fn write_map(dir: &Path, rel: &str, map: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, map).unwrap();
    }

    const MAP: &str = r#"{
        "version": 3,
        "sources": ["pages/a.js"],
        "names": ["boom"],
        "mappings": "AAAAA",
        "sourcesContent": ["throw new Error('x')\nmore()\n"]
    }"#;

    #[test]
    fn test_remap_bundle_identifier() {
        let temp = TempDir::new().unwrap();
        write_map(temp.path(), "server/pages/a.js.map", MAP);

        let remapper = DiagnosticsRemapper::new(temp.path().to_path_buf());
        let frame = parse_frame("    at render (pages/a.js:1:1)").unwrap();
        let original = remapper.remap_frame(&frame).unwrap();

        assert_eq!(original.file, "pages/a.js");
        assert_eq!(original.function.as_deref(), Some("boom"));
        assert_eq!((original.line, original.column), (1, 1));
        assert!(original.snippet.unwrap().contains("throw new Error"));
    }

    #[test]
    fn test_remap_absolute_path_uses_sibling_map() {
        let temp = TempDir::new().unwrap();
        let bundle = temp.path().join("bundle.js");
        std::fs::write(&bundle, "compiled\n").unwrap();
        std::fs::write(temp.path().join("bundle.js.map"), MAP).unwrap();

        let remapper = DiagnosticsRemapper::new(PathBuf::from("/nonexistent"));
        let frame = StackFrame {
            function: None,
            file: bundle.display().to_string(),
            line: 1,
            column: 1,
        };
        let original = remapper.remap_frame(&frame).unwrap();
        assert_eq!(original.file, "pages/a.js");
    }

    #[test]
    fn test_missing_map_is_silent() {
        let remapper = DiagnosticsRemapper::new(PathBuf::from("/nonexistent"));
        let frame = parse_frame("    at render (pages/a.js:1:1)").unwrap();
        assert!(remapper.remap_frame(&frame).is_none());

        // remap_and_log falls back to raw text without failing
        remapper.remap_and_log("", "Error: boom\n    at render (pages/a.js:1:1)");
    }

    #[test]
    fn test_overlay_resolved_once() {
        let temp = TempDir::new().unwrap();
        let remapper = DiagnosticsRemapper::new(temp.path().to_path_buf());

        let first = Arc::new(CapturingSink {
            seen: Mutex::new(Vec::new()),
        });
        let second = Arc::new(CapturingSink {
            seen: Mutex::new(Vec::new()),
        });
        remapper.set_overlay(first.clone());
        remapper.set_overlay(second.clone());

        remapper.remap_and_log("", "Error: boom");
        assert_eq!(first.seen.lock().len(), 1);
        assert!(second.seen.lock().is_empty());
    }

    #[test]
    fn test_not_found_never_reported() {
        let temp = TempDir::new().unwrap();
        let remapper = DiagnosticsRemapper::new(temp.path().to_path_buf());
        let sink = Arc::new(CapturingSink {
            seen: Mutex::new(Vec::new()),
        });
        remapper.set_overlay(sink.clone());

        remapper.report_request_error(&RequestError::PageNotFound("/x".into()));
        assert!(sink.seen.lock().is_empty());
    }

    #[test]
    fn test_render_snippet_bounds() {
        let content = "a\nb\nc\nd\ne\nf\ng\nh\n";
        let snippet = render_snippet(content, 1).unwrap();
        assert!(snippet.starts_with(">    1 | a"));

        let snippet = render_snippet(content, 5).unwrap();
        assert!(snippet.contains(">    5 | e"));
        assert!(snippet.contains("   2 | b"));

        assert!(render_snippet(content, 99).is_none());
    }
}
