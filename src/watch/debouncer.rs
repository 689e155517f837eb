use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::FxHashMap;

pub(super) const DEBOUNCE_MS: u64 = 300;
pub(super) const RESCAN_COOLDOWN_MS: u64 = 800;

/// File change kinds tracked by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Pure debouncer: only handles timing and event deduplication.
/// No business logic, no global state access.
pub(super) struct Debouncer {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<std::time::Instant>,
    pub(super) last_rescan: Option<std::time::Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_rescan: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Removed + Created/Modified → Created/Modified (file was restored)
    /// - Modified + Removed → Removed (file was deleted)
    /// - Created + Removed → discard (appeared then vanished)
    /// - Same type events: first event wins
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // Ignore metadata-only changes (mtime/atime/chmod noise)
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }

            let path = path.clone();

            if let Some(&existing) = self.changes.get(&path) {
                match (existing, kind) {
                    (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                        crate::debug!("watch"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                        self.changes.insert(path, kind);
                    }
                    (ChangeKind::Modified, ChangeKind::Removed) => {
                        crate::debug!("watch"; "upgrade modified->removed: {}", path.display());
                        self.changes.insert(path, ChangeKind::Removed);
                    }
                    (ChangeKind::Created, ChangeKind::Removed) => {
                        crate::debug!("watch"; "discard created+removed: {}", path.display());
                        self.changes.remove(&path);
                    }
                    _ => {
                        // Same kind or other combos (Created+Modified, etc.) → first wins
                        continue;
                    }
                }
                self.last_event = Some(std::time::Instant::now());
                continue;
            }

            crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
            self.changes.insert(path, kind);
            self.last_event = Some(std::time::Instant::now());
        }
    }

    /// Take raw events if debounce + cooldown elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;

        if changes.is_empty() {
            return None;
        }

        self.last_rescan = Some(std::time::Instant::now());
        Some(changes)
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }

        if let Some(last_rescan) = self.last_rescan
            && last_rescan.elapsed() < Duration::from_millis(RESCAN_COOLDOWN_MS)
        {
            return false;
        }

        !self.changes.is_empty()
    }

    /// Precise sleep duration until next possible ready time.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining =
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());

        let cooldown_remaining = self
            .last_rescan
            .map(|t| Duration::from_millis(RESCAN_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.into_iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    fn modify_kind() -> notify::EventKind {
        notify::EventKind::Modify(notify::event::ModifyKind::Data(
            notify::event::DataChange::Any,
        ))
    }

    fn create_kind() -> notify::EventKind {
        notify::EventKind::Create(notify::event::CreateKind::File)
    }

    fn remove_kind() -> notify::EventKind {
        notify::EventKind::Remove(notify::event::RemoveKind::File)
    }

    #[test]
    fn test_empty_not_ready() {
        let debouncer = Debouncer::new();
        assert!(!debouncer.is_ready());
    }

    #[test]
    fn test_event_kinds_tracked() {
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&make_event(vec!["/p/a.js"], create_kind()));
        debouncer.add_event(&make_event(vec!["/p/b.js"], modify_kind()));
        debouncer.add_event(&make_event(vec!["/p/c.js"], remove_kind()));

        assert_eq!(debouncer.changes.len(), 3);
        assert_eq!(debouncer.changes[&PathBuf::from("/p/a.js")], ChangeKind::Created);
        assert_eq!(debouncer.changes[&PathBuf::from("/p/b.js")], ChangeKind::Modified);
        assert_eq!(debouncer.changes[&PathBuf::from("/p/c.js")], ChangeKind::Removed);
    }

    #[test]
    fn test_temp_file_ignored() {
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&make_event(vec!["/p/real.js"], modify_kind()));
        let first_time = debouncer.last_event.unwrap();

        std::thread::sleep(Duration::from_millis(5));

        debouncer.add_event(&make_event(vec!["/p/.index.js.swp"], modify_kind()));
        assert_eq!(debouncer.last_event.unwrap(), first_time);
        assert_eq!(debouncer.changes.len(), 1);
    }

    #[test]
    fn test_created_then_removed_discarded() {
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&make_event(vec!["/p/a.js"], create_kind()));
        debouncer.add_event(&make_event(vec!["/p/a.js"], remove_kind()));
        assert!(debouncer.changes.is_empty());
    }

    #[test]
    fn test_modified_then_removed_upgrades() {
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&make_event(vec!["/p/a.js"], modify_kind()));
        debouncer.add_event(&make_event(vec!["/p/a.js"], remove_kind()));
        assert_eq!(debouncer.changes[&PathBuf::from("/p/a.js")], ChangeKind::Removed);
    }

    #[test]
    fn test_removed_then_created_restores() {
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&make_event(vec!["/p/a.js"], remove_kind()));
        debouncer.add_event(&make_event(vec!["/p/a.js"], create_kind()));
        assert_eq!(debouncer.changes[&PathBuf::from("/p/a.js")], ChangeKind::Created);
    }

    #[test]
    fn test_metadata_change_ignored() {
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&make_event(
            vec!["/p/a.js"],
            notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
                notify::event::MetadataKind::Any,
            )),
        ));
        assert!(debouncer.changes.is_empty());
    }

    #[test]
    fn test_not_ready_within_debounce_window() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/p/a.js"], create_kind()));
        assert!(!debouncer.is_ready());
        assert!(debouncer.take_if_ready().is_none());
    }
}
