//! Static asset resolution with path containment.
//!
//! Every filename served from disk is checked against a fixed allow-list
//! of roots: build-output `static/`, build-output `server/`, the legacy
//! top-level `static/` directory, and the public assets root. A path that
//! carries a NUL byte or resolves outside every allowed root is treated
//! as not-found; the resolved path is never echoed back.

use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::core::UrlPath;
use crate::utils::is_contained_in;

pub struct AssetRoots {
    output_dir: PathBuf,
    output_static: PathBuf,
    output_server: PathBuf,
    legacy_static: PathBuf,
    public: PathBuf,
}

impl AssetRoots {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            output_dir: config.output_dir(),
            output_static: config.output_static_dir(),
            output_server: config.output_server_dir(),
            legacy_static: config.legacy_static_dir(),
            public: config.public_dir(),
        }
    }

    /// Resolve a dev-asset request (`/_next/development/<relative>`)
    /// against the build output directory. Only its `static/` and
    /// `server/` subtrees are servable.
    pub fn resolve_dev_asset(&self, relative: &str) -> Option<PathBuf> {
        let candidate = self.output_dir.join(safe_relative(relative)?);
        self.admit(candidate, &[&self.output_static, &self.output_server])
    }

    /// Resolve a request path against the public assets root, falling
    /// back to the legacy `static/` directory for `/static/*` paths.
    pub fn resolve_public_asset(&self, path: &UrlPath) -> Option<PathBuf> {
        let relative = safe_relative(path.as_str().trim_start_matches('/'))?;

        let candidate = self.public.join(&relative);
        if let Some(found) = self.admit(candidate, &[&self.public]) {
            return Some(found);
        }

        if let Ok(stripped) = relative.strip_prefix("static") {
            let candidate = self.legacy_static.join(stripped);
            return self.admit(candidate, &[&self.legacy_static]);
        }

        None
    }

    /// Admit a candidate only when it is an existing file under one of
    /// the given allow-listed roots.
    fn admit(&self, candidate: PathBuf, roots: &[&PathBuf]) -> Option<PathBuf> {
        if !candidate.is_file() {
            return None;
        }
        let resolved = candidate.canonicalize().ok()?;
        roots
            .iter()
            .any(|root| is_contained_in(&resolved, root))
            .then_some(resolved)
    }
}

/// Reject NUL bytes and absolute/parent components up front; containment
/// is still enforced on the resolved path afterwards.
fn safe_relative(relative: &str) -> Option<PathBuf> {
    if relative.contains('\0') {
        return None;
    }
    let path = Path::new(relative);
    if path.is_absolute() {
        return None;
    }
    if path
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)))
    {
        return None;
    }
    Some(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(temp: &TempDir) -> AssetRoots {
        let mut config = ProjectConfig::from_str("").unwrap();
        config.set_root(temp.path());

        for dir in ["public", "static", ".pavo/static", ".pavo/server"] {
            std::fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        AssetRoots::from_config(&config)
    }

    fn write(temp: &TempDir, rel: &str) {
        let path = temp.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"data").unwrap();
    }

    #[test]
    fn test_dev_asset_resolves_in_output_subtrees() {
        let temp = TempDir::new().unwrap();
        let roots = setup(&temp);
        write(&temp, ".pavo/server/pages/a.js");
        write(&temp, ".pavo/static/chunks/main.js");

        assert!(roots.resolve_dev_asset("server/pages/a.js").is_some());
        assert!(roots.resolve_dev_asset("static/chunks/main.js").is_some());
        assert!(roots.resolve_dev_asset("server/pages/missing.js").is_none());
    }

    #[test]
    fn test_dev_asset_outside_subtrees_rejected() {
        let temp = TempDir::new().unwrap();
        let roots = setup(&temp);
        // Exists directly in the output dir, but not under static/ or server/
        write(&temp, ".pavo/trace.log");

        assert!(roots.resolve_dev_asset("trace.log").is_none());
    }

    #[test]
    fn test_nul_byte_rejected() {
        let temp = TempDir::new().unwrap();
        let roots = setup(&temp);
        write(&temp, "public/logo.png");

        assert!(roots.resolve_dev_asset("a\0b").is_none());
        assert!(
            roots
                .resolve_public_asset(&UrlPath::new("/logo\0.png"))
                .is_none()
        );
    }

    #[test]
    fn test_traversal_rejected() {
        let temp = TempDir::new().unwrap();
        let roots = setup(&temp);
        write(&temp, "secret.txt");

        assert!(roots.resolve_dev_asset("../secret.txt").is_none());
        assert!(
            roots
                .resolve_public_asset(&UrlPath::new("/../secret.txt"))
                .is_none()
        );
    }

    #[test]
    fn test_public_asset_and_legacy_static() {
        let temp = TempDir::new().unwrap();
        let roots = setup(&temp);
        write(&temp, "public/logo.png");
        write(&temp, "static/legacy.txt");

        assert!(
            roots
                .resolve_public_asset(&UrlPath::new("/logo.png"))
                .is_some()
        );
        assert!(
            roots
                .resolve_public_asset(&UrlPath::new("/static/legacy.txt"))
                .is_some()
        );
        assert!(
            roots
                .resolve_public_asset(&UrlPath::new("/missing.png"))
                .is_none()
        );
    }

    #[test]
    fn test_symlink_escape_rejected() {
        let temp = TempDir::new().unwrap();
        let roots = setup(&temp);
        write(&temp, "outside.txt");

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(
                temp.path().join("outside.txt"),
                temp.path().join("public/link.txt"),
            )
            .unwrap();
            // Symlink resolves outside the public root
            assert!(
                roots
                    .resolve_public_asset(&UrlPath::new("/link.txt"))
                    .is_none()
            );
        }
    }
}
