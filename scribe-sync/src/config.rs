//! Session configuration.

use std::time::Duration;

/// Timing knobs for one editor session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet window before a published format state reaches observers (default: 50ms)
    pub format_debounce: Duration,
    /// Quiet window before an autosave fires (default: 2s)
    pub autosave_delay: Duration,
    /// Re-detect after format changes that touch the document and compare
    /// with the expected state (default: true)
    pub verify_after_apply: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            format_debounce: Duration::from_millis(50),
            autosave_delay: Duration::from_secs(2),
            verify_after_apply: true,
        }
    }
}

impl SessionConfig {
    /// Create config for testing (short windows).
    pub fn for_testing() -> Self {
        Self {
            format_debounce: Duration::from_millis(5),
            autosave_delay: Duration::from_millis(20),
            verify_after_apply: true,
        }
    }
}
