//! Preview-mode credentials.
//!
//! Generated lazily, once per process, and never persisted: restarting the
//! server invalidates every outstanding preview link.

use std::sync::OnceLock;

use rand::RngCore;

/// Per-process preview secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewProps {
    /// Identifies this process's preview mode (16 bytes, hex).
    pub preview_mode_id: String,
    /// Cookie signing key (32 bytes, hex).
    pub signing_key: String,
    /// Payload encryption key (32 bytes, hex).
    pub encryption_key: String,
}

impl PreviewProps {
    fn generate() -> Self {
        Self {
            preview_mode_id: random_hex(16),
            signing_key: random_hex(32),
            encryption_key: random_hex(32),
        }
    }
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Lazy accessor for the process's preview secrets.
#[derive(Default)]
pub struct PreviewPropsCache {
    props: OnceLock<PreviewProps>,
}

impl PreviewPropsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate on first access; identical values thereafter.
    pub fn get(&self) -> &PreviewProps {
        self.props.get_or_init(PreviewProps::generate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_within_process() {
        let cache = PreviewPropsCache::new();
        let first = cache.get().clone();
        let second = cache.get().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fresh_after_restart() {
        // A new cache stands in for a restarted process
        let before = PreviewPropsCache::new().get().clone();
        let after = PreviewPropsCache::new().get().clone();
        assert_ne!(before, after);
    }

    #[test]
    fn test_lengths() {
        let cache = PreviewPropsCache::new();
        let props = cache.get();
        assert_eq!(props.preview_mode_id.len(), 32);
        assert_eq!(props.signing_key.len(), 64);
        assert_eq!(props.encryption_key.len(), 64);
        assert!(props.preview_mode_id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
