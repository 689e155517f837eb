//! Command-driven bundler.
//!
//! Delegates page compilation to an external compiler command configured in
//! `[build] compile_command`; `{page}` in the command is substituted with
//! the page pathname. Failures are recorded in the compilation-error
//! registry keyed by page. Without a configured command, artifacts are
//! expected to be prebuilt on disk.

use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use dashmap::DashMap;
use tiny_http::Request;

use crate::config::ProjectConfig;

use super::{BundleError, Bundler, RunOutcome};

/// Minimal error document written as the fallback-error artifact, served
/// when the project's own error page cannot build.
const FALLBACK_ERROR_HTML: &str = "<!doctype html>\n<html>\n<head><title>Server Error</title></head>\n<body><h1>Internal Server Error</h1></body>\n</html>\n";

/// Artifact name of the fallback error document under `server/pages/`.
pub const FALLBACK_ERROR_FILE: &str = "_error.fallback.html";

pub struct CommandBundler {
    config: Arc<ProjectConfig>,
    errors: DashMap<String, Vec<BundleError>>,
    started: AtomicBool,
}

impl CommandBundler {
    pub fn new(config: Arc<ProjectConfig>) -> Self {
        Self {
            config,
            errors: DashMap::new(),
            started: AtomicBool::new(false),
        }
    }

    fn compile(&self, pathname: &str) -> Result<()> {
        let Some(template) = &self.config.build.compile_command else {
            // No compiler configured: artifacts are prebuilt
            return Ok(());
        };

        let command = template.replace("{page}", pathname);
        crate::debug!("build"; "compile: {}", command);

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(self.config.get_root())
            .output()
            .with_context(|| format!("spawning compiler for {pathname}"))?;

        if output.status.success() {
            self.errors.remove(pathname);
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("compiler exited with {}", output.status)
        } else {
            stderr.trim().to_string()
        };
        self.errors.insert(
            pathname.to_string(),
            vec![BundleError {
                page: pathname.to_string(),
                message: message.clone(),
            }],
        );
        Err(anyhow!("compilation failed for {pathname}: {message}"))
    }
}

impl Bundler for CommandBundler {
    fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        crate::debug!("build"; "bundler started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if self.started.swap(false, Ordering::SeqCst) {
            crate::debug!("build"; "bundler stopped");
        }
        Ok(())
    }

    fn ensure_page(&self, pathname: &str) -> Result<()> {
        self.compile(pathname)
    }

    fn compilation_errors(&self, pathname: &str) -> Vec<BundleError> {
        self.errors
            .get(pathname)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    fn run(&self, request: Request) -> Result<RunOutcome> {
        // No middleware endpoints in the command bundler
        Ok(RunOutcome::Continue(request))
    }

    fn build_fallback_error(&self) -> Result<()> {
        let pages_dir = self.config.output_server_dir().join("pages");
        std::fs::create_dir_all(&pages_dir)
            .with_context(|| format!("creating {}", pages_dir.display()))?;
        std::fs::write(pages_dir.join(FALLBACK_ERROR_FILE), FALLBACK_ERROR_HTML)
            .context("writing fallback error artifact")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with(temp: &TempDir, toml: &str) -> Arc<ProjectConfig> {
        let mut config = ProjectConfig::from_str(toml).unwrap();
        config.set_root(temp.path());
        Arc::new(config)
    }

    #[test]
    fn test_no_command_means_prebuilt() {
        let temp = TempDir::new().unwrap();
        let bundler = CommandBundler::new(config_with(&temp, ""));

        bundler.ensure_page("/a").unwrap();
        assert!(bundler.compilation_errors("/a").is_empty());
    }

    #[test]
    fn test_failed_compile_recorded_and_cleared() {
        let temp = TempDir::new().unwrap();
        let bundler = CommandBundler::new(config_with(
            &temp,
            "[build]\ncompile_command = \"test -e .{page}.ok\"",
        ));

        assert!(bundler.ensure_page("/a").is_err());
        let errors = bundler.compilation_errors("/a");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].page, "/a");

        // The substituted command is `test -e ./a.ok`; create the file so
        // compilation succeeds and the registry entry clears
        std::fs::write(temp.path().join("a.ok"), b"").unwrap();
        bundler.ensure_page("/a").unwrap();
        assert!(bundler.compilation_errors("/a").is_empty());
    }

    #[test]
    fn test_build_fallback_error_writes_artifact() {
        let temp = TempDir::new().unwrap();
        let bundler = CommandBundler::new(config_with(&temp, ""));

        bundler.build_fallback_error().unwrap();
        let artifact = temp
            .path()
            .join(".pavo/server/pages")
            .join(FALLBACK_ERROR_FILE);
        assert!(artifact.is_file());
    }
}
