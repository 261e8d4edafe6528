//! # scribe-sync — Live editor sessions for Scribe
//!
//! Wires the pure pieces of `scribe-core` into a running session: debounced
//! toolbar updates, change tracking and autosave.
//!
//! ## Architecture
//!
//! ```text
//!  caret / edit / format command
//!              │
//!              ▼
//!     ┌─────────────────┐  typing attrs   ┌──────────────────┐
//!     │  EditorSession  │ ──────────────► │ TextInputSurface │
//!     └──┬───────────┬──┘                 └──────────────────┘
//!        │           │ publish_from(id)
//!        │           ▼
//!        │   ┌───────────────────────┐  50ms debounce   ┌────────────────────┐
//!        │   │ FormatStateBroadcaster│ ───────────────► │ FormatStateStream  │ × N
//!        │   └───────────────────────┘  dedup           └────────────────────┘
//!        │ record_edit
//!        ▼
//!  ┌───────────────┐      ┌──────────────────┐  2s debounce   ┌─────────────┐
//!  │ ChangeTracker │ ◄──► │ AutoSaveScheduler│ ─────────────► │ SaveBackend │
//!  └───────────────┘      └──────────────────┘  single flight └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] — `EditorSession`, one per open note
//! - [`broadcaster`] — debounced, deduplicated format-state fan-out
//! - [`change_tracker`] — version counter with a programmatic-change guard
//! - [`autosave`] — debounced single-flight saves with concurrent-edit detection
//! - [`backend`] — `SaveBackend` trait, in-memory and lz4 file backends
//! - [`surface`] — `TextInputSurface` trait
//! - [`config`] — `SessionConfig`
//!
//! ## Timing
//!
//! | Window            | Default | Edge     |
//! |-------------------|---------|----------|
//! | Format broadcast  | 50ms    | trailing |
//! | Autosave          | 2s      | trailing |

pub mod autosave;
pub mod backend;
pub mod broadcaster;
pub mod change_tracker;
pub mod config;
pub mod session;
pub mod surface;

// Re-exports for convenience
pub use autosave::{AutoSaveScheduler, AutoSaveStats, FireOutcome, SaveStatus};
pub use backend::{FileBackend, FileBackendConfig, MemoryBackend, SaveBackend, SaveError};
pub use broadcaster::{BroadcastStats, FormatStateBroadcaster, FormatStateStream, ProviderId};
pub use change_tracker::{ChangeTracker, EditKind};
pub use config::SessionConfig;
pub use session::{EditorSession, SessionError, SessionStats};
pub use surface::{RecordingSurface, TextInputSurface};
