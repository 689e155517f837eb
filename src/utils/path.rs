//! Filesystem path utilities.

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Whether `path` resolves under `root`, comparing canonical forms.
///
/// Both sides are canonicalized so symlinks and `..` cannot escape the
/// root. A root that does not exist contains nothing.
pub fn is_contained_in(path: &Path, root: &Path) -> bool {
    let Ok(root) = root.canonicalize() else {
        return false;
    };
    let Ok(path) = path.canonicalize() else {
        return false;
    };
    path.starts_with(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path_absolute() {
        let normalized = normalize_path(Path::new("/absolute/path/file.txt"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_containment() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("sub/file.txt"), b"x").unwrap();

        assert!(is_contained_in(&root.join("sub/file.txt"), root));
        assert!(is_contained_in(&root.join("sub"), root));
        assert!(!is_contained_in(Path::new("/etc/hosts"), root));
    }

    #[test]
    fn test_traversal_not_contained() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir(root.join("sub")).unwrap();

        // `..` escapes the root once canonicalized
        let sneaky = root.join("sub/../..");
        assert!(!is_contained_in(&sneaky, root));
    }

    #[test]
    fn test_missing_root_contains_nothing() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("f"), b"x").unwrap();
        assert!(!is_contained_in(
            &temp.path().join("f"),
            &temp.path().join("missing-root")
        ));
    }
}
