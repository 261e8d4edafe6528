//! Document version tracking.
//!
//! ```text
//!            record_edit()                 did_save_*()
//!   clean ─────────────────► dirty ──────────────────────► clean
//!   version == last_saved    version > last_saved
//! ```
//!
//! Loads and other programmatic mutations run inside
//! `perform_programmatic_change`, which suppresses `record_edit` so a freshly
//! opened note is never reported as unsaved.

/// What kind of user edit bumped the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    Text,
    Format,
    Attachment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
    last_saved_version: u64,
    has_user_edits: bool,
    is_programmatic_change: bool,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn last_saved_version(&self) -> u64 {
        self.last_saved_version
    }

    pub fn has_user_edits(&self) -> bool {
        self.has_user_edits
    }

    pub fn is_programmatic_change(&self) -> bool {
        self.is_programmatic_change
    }

    /// Count a user edit. Returns false when suppressed by a programmatic change.
    pub fn record_edit(&mut self, kind: EditKind) -> bool {
        if self.is_programmatic_change {
            log::trace!("Ignoring {kind:?} edit during programmatic change");
            return false;
        }
        self.version += 1;
        self.has_user_edits = true;
        log::trace!("{kind:?} edit -> version {}", self.version);
        true
    }

    /// Run `block` with edits suppressed. Nests: the previous guard value is
    /// restored afterwards.
    pub fn perform_programmatic_change<R>(&mut self, block: impl FnOnce(&mut Self) -> R) -> R {
        let prior = self.is_programmatic_change;
        self.is_programmatic_change = true;
        let result = block(self);
        self.is_programmatic_change = prior;
        result
    }

    pub fn needs_save(&self) -> bool {
        self.version > self.last_saved_version && self.has_user_edits
    }

    /// The current version reached storage.
    pub fn did_save_succeed(&mut self) {
        self.last_saved_version = self.version;
        self.has_user_edits = false;
    }

    /// A specific version reached storage. Edits made after `saved` keep the
    /// tracker dirty.
    pub fn did_save_version_succeed(&mut self, saved: u64) {
        let saved = saved.min(self.version);
        self.last_saved_version = self.last_saved_version.max(saved);
        if saved == self.version {
            self.has_user_edits = false;
        }
    }

    /// Nothing changes: the dirty state survives so the next cycle retries.
    pub fn did_save_fail(&mut self) {
        log::debug!(
            "Save failed; version {} still unsaved (last saved {})",
            self.version,
            self.last_saved_version
        );
    }

    pub fn has_new_edits_since(&self, saving_version: u64) -> bool {
        self.version > saving_version
    }

    /// Forget everything; used when the session switches to another document.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_tracker_is_clean() {
        let tracker = ChangeTracker::new();
        assert_eq!(tracker.version(), 0);
        assert!(!tracker.needs_save());
        assert!(!tracker.has_user_edits());
    }

    #[test]
    fn test_record_edit_dirties() {
        let mut tracker = ChangeTracker::new();
        assert!(tracker.record_edit(EditKind::Text));
        assert_eq!(tracker.version(), 1);
        assert!(tracker.needs_save());
        tracker.record_edit(EditKind::Format);
        tracker.record_edit(EditKind::Attachment);
        assert_eq!(tracker.version(), 3);
    }

    #[test]
    fn test_programmatic_change_suppresses_edits() {
        let mut tracker = ChangeTracker::new();
        tracker.perform_programmatic_change(|t| {
            assert!(!t.record_edit(EditKind::Text));
            assert!(t.is_programmatic_change());
        });
        assert_eq!(tracker.version(), 0);
        assert!(!tracker.needs_save());
        assert!(!tracker.is_programmatic_change());
    }

    #[test]
    fn test_programmatic_change_nests() {
        let mut tracker = ChangeTracker::new();
        let value = tracker.perform_programmatic_change(|outer| {
            outer.perform_programmatic_change(|inner| {
                inner.record_edit(EditKind::Text);
            });
            // Still guarded after the inner block returns.
            assert!(outer.is_programmatic_change());
            outer.record_edit(EditKind::Text);
            42
        });
        assert_eq!(value, 42);
        assert!(!tracker.needs_save());
        assert!(tracker.record_edit(EditKind::Text));
        assert!(tracker.needs_save());
    }

    #[test]
    fn test_reset_then_programmatic_is_clean() {
        let mut tracker = ChangeTracker::new();
        tracker.record_edit(EditKind::Text);
        tracker.reset();
        for _ in 0..5 {
            tracker.perform_programmatic_change(|t| {
                t.record_edit(EditKind::Text);
            });
        }
        assert!(!tracker.needs_save());
        assert_eq!(tracker, ChangeTracker::new());
    }

    #[test]
    fn test_save_succeed_and_fail() {
        let mut tracker = ChangeTracker::new();
        tracker.record_edit(EditKind::Text);
        tracker.did_save_fail();
        assert!(tracker.needs_save());

        tracker.did_save_succeed();
        assert!(!tracker.needs_save());
        assert_eq!(tracker.last_saved_version(), 1);
    }

    #[test]
    fn test_versioned_save_keeps_newer_edits_dirty() {
        let mut tracker = ChangeTracker::new();
        tracker.record_edit(EditKind::Text); // 1, being saved
        tracker.record_edit(EditKind::Text); // 2, typed during the save
        assert!(tracker.has_new_edits_since(1));

        tracker.did_save_version_succeed(1);
        assert_eq!(tracker.last_saved_version(), 1);
        assert!(tracker.needs_save());

        tracker.did_save_version_succeed(2);
        assert_eq!(tracker.last_saved_version(), 2);
        assert!(!tracker.needs_save());
        assert!(!tracker.has_new_edits_since(2));
    }

    #[test]
    fn test_stale_versioned_save_never_moves_backwards() {
        let mut tracker = ChangeTracker::new();
        for _ in 0..3 {
            tracker.record_edit(EditKind::Text);
        }
        tracker.did_save_version_succeed(3);
        tracker.did_save_version_succeed(1);
        assert_eq!(tracker.last_saved_version(), 3);
        assert!(!tracker.needs_save());
    }
}
