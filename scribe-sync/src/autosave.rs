//! Debounced, single-flight autosave with concurrent-edit detection.
//!
//! ```text
//!  edit ─► schedule_auto_save ─► [2s quiet] ─► fire
//!                                               │
//!              ┌────────────────────────────────┼──────────────────────────┐
//!              ▼                                ▼                          ▼
//!        save in flight                   !needs_save                 encode(doc)
//!        rerun on completion              nothing to do               saving_version = v
//!                                                                     spawn backend.save
//!                                                                          │
//!                                      completion ◄────────────────────────┘
//!                                      ok:  tracker.did_save_version_succeed(v)
//!                                      err: tracker.did_save_fail(), keep backup
//!                                      edits newer than v? schedule again
//! ```
//!
//! The document is encoded on the firing context, so the bytes always match
//! `saving_version`. Edits made while the backend works bump the tracker past
//! `saving_version` and trigger another cycle; they are never reported saved
//! by the older write.
//!
//! Lock order: scheduler state, then tracker, then document. No lock is held
//! across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use scribe_core::{Codec, RichTextDocument};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::backend::{SaveBackend, SaveError};
use crate::change_tracker::ChangeTracker;

/// Badge state for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Unsaved,
    Saving,
    /// The last save failed and the document is still dirty.
    RetryPending,
}

/// What one firing of the save logic did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Nothing to save.
    Clean,
    /// A save was already in flight; another cycle runs after it completes.
    Deferred,
    /// Encoding failed; the document stays dirty.
    EncodeFailed,
    /// No tokio runtime to run the backend on.
    NoRuntime,
    /// Bytes for `version` were handed to the backend.
    Started { version: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoSaveStats {
    pub fired: u64,
    pub skipped_clean: u64,
    pub deferred_in_flight: u64,
    pub encode_failures: u64,
    pub saves_succeeded: u64,
    pub saves_failed: u64,
    pub rescheduled: u64,
}

#[derive(Default)]
struct SchedulerState {
    timer: Option<JoinHandle<()>>,
    /// Bumped on every (re)schedule and cancel; stale timers do nothing.
    generation: u64,
    saving_version: Option<u64>,
    /// A fire arrived while a save was in flight.
    rerun_requested: bool,
    pending_retry: bool,
    backup: Option<Vec<u8>>,
    /// Bumped on document switch; completions from an older epoch do not
    /// touch the tracker.
    epoch: u64,
    stats: AutoSaveStats,
}

impl SchedulerState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation += 1;
    }

    fn is_idle(&self) -> bool {
        self.timer.is_none() && self.saving_version.is_none()
    }
}

struct SchedulerShared {
    delay: Duration,
    tracker: Arc<Mutex<ChangeTracker>>,
    document: Arc<RwLock<RichTextDocument>>,
    codec: Arc<dyn Codec>,
    backend: Arc<dyn SaveBackend>,
    state: Mutex<SchedulerState>,
    idle: Notify,
}

impl SchedulerShared {
    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tracker(&self) -> MutexGuard<'_, ChangeTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule_locked(self: &Arc<Self>, state: &mut SchedulerState) {
        state.cancel_timer();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("No tokio runtime; autosave not scheduled");
            return;
        };
        let generation = state.generation;
        let shared = Arc::clone(self);
        state.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(shared.delay).await;
            shared.fire_from_timer(generation);
        }));
        log::debug!("Autosave scheduled in {:?}", self.delay);
    }

    fn fire_from_timer(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.state();
            if state.generation != generation {
                return;
            }
            state.timer = None;
            log::debug!("Autosave timer fired");
            self.fire_locked(&mut state);
        }
        self.idle.notify_waiters();
    }

    fn fire_locked(self: &Arc<Self>, state: &mut SchedulerState) -> FireOutcome {
        state.stats.fired += 1;
        if let Some(in_flight) = state.saving_version {
            state.rerun_requested = true;
            state.stats.deferred_in_flight += 1;
            log::debug!("Save of version {in_flight} still in flight; deferring");
            return FireOutcome::Deferred;
        }

        let version = {
            let tracker = self.tracker();
            if !tracker.needs_save() {
                state.stats.skipped_clean += 1;
                return FireOutcome::Clean;
            }
            tracker.version()
        };

        let encoded = {
            let document = self.document.read().unwrap_or_else(PoisonError::into_inner);
            self.codec.encode(&document)
        };
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                state.stats.encode_failures += 1;
                log::error!("Failed to encode version {version} with {}: {e}", self.codec.name());
                return FireOutcome::EncodeFailed;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("No tokio runtime; save of version {version} not started");
            return FireOutcome::NoRuntime;
        };

        state.saving_version = Some(version);
        let epoch = state.epoch;
        let shared = Arc::clone(self);
        runtime.spawn(async move {
            let result = shared.backend.save(&bytes).await;
            shared.complete(epoch, version, bytes, result);
        });
        log::debug!("Save of version {version} started");

        if self.tracker().has_new_edits_since(version) {
            state.stats.rescheduled += 1;
            self.schedule_locked(state);
        }
        FireOutcome::Started { version }
    }

    fn complete(self: &Arc<Self>, epoch: u64, version: u64, bytes: Vec<u8>, result: Result<(), SaveError>) {
        {
            let mut state = self.state();
            if state.epoch != epoch {
                match result {
                    Ok(()) => log::info!("Saved version {version} of a previous document"),
                    Err(e) => log::warn!("Save of a previous document failed: {e}"),
                }
            } else {
                state.saving_version = None;
                let rerun = std::mem::take(&mut state.rerun_requested);
                match result {
                    Ok(()) => {
                        state.pending_retry = false;
                        state.backup = None;
                        state.stats.saves_succeeded += 1;
                        self.tracker().did_save_version_succeed(version);
                        log::info!("Saved version {version} ({} bytes)", bytes.len());
                    }
                    Err(e) => {
                        state.pending_retry = true;
                        state.backup = Some(bytes);
                        state.stats.saves_failed += 1;
                        self.tracker().did_save_fail();
                        log::warn!("Save of version {version} failed: {e}");
                    }
                }

                let resave = {
                    let tracker = self.tracker();
                    tracker.needs_save() && (rerun || tracker.has_new_edits_since(version))
                };
                if resave {
                    state.stats.rescheduled += 1;
                    self.schedule_locked(&mut state);
                }
            }
        }
        self.idle.notify_waiters();
    }
}

/// Owns the autosave timer for one document. Dropping the scheduler cancels a
/// pending timer; a save already handed to the backend still completes.
pub struct AutoSaveScheduler {
    shared: Arc<SchedulerShared>,
}

impl AutoSaveScheduler {
    pub fn new(
        delay: Duration,
        tracker: Arc<Mutex<ChangeTracker>>,
        document: Arc<RwLock<RichTextDocument>>,
        codec: Arc<dyn Codec>,
        backend: Arc<dyn SaveBackend>,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                delay,
                tracker,
                document,
                codec,
                backend,
                state: Mutex::new(SchedulerState::default()),
                idle: Notify::new(),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay
    }

    /// (Re)start the quiet window. The fire decides whether anything needs
    /// saving.
    pub fn schedule_auto_save(&self) {
        let mut state = self.shared.state();
        self.shared.schedule_locked(&mut state);
    }

    /// Idempotent.
    pub fn cancel_auto_save(&self) {
        {
            let mut state = self.shared.state();
            if state.timer.is_some() {
                log::debug!("Autosave cancelled");
            }
            state.cancel_timer();
        }
        self.shared.idle.notify_waiters();
    }

    /// Cancel the timer and run the save logic now.
    pub fn save_immediately(&self) -> FireOutcome {
        let mut state = self.shared.state();
        state.cancel_timer();
        self.shared.fire_locked(&mut state)
    }

    /// Try again after a failed save, without waiting for a new edit.
    pub fn retry_failed_save(&self) -> FireOutcome {
        if self.has_failed_save() {
            log::info!("Retrying failed save");
        }
        self.save_immediately()
    }

    /// Detach from the current document: cancel the timer, forget failure
    /// state, and ignore the tracker for any save still in flight.
    pub fn begin_new_document(&self) {
        {
            let mut state = self.shared.state();
            state.cancel_timer();
            state.epoch += 1;
            state.saving_version = None;
            state.rerun_requested = false;
            state.pending_retry = false;
            state.backup = None;
        }
        self.shared.idle.notify_waiters();
    }

    /// Resolves once no timer is armed and no save is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.state().is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.shared.state().timer.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.shared.state().saving_version.is_some()
    }

    pub fn saving_version(&self) -> Option<u64> {
        self.shared.state().saving_version
    }

    pub fn has_failed_save(&self) -> bool {
        self.shared.state().pending_retry
    }

    pub fn status(&self) -> SaveStatus {
        let state = self.shared.state();
        if state.saving_version.is_some() {
            return SaveStatus::Saving;
        }
        let dirty = self.shared.tracker().needs_save();
        match (dirty, state.pending_retry) {
            (true, true) => SaveStatus::RetryPending,
            (true, false) => SaveStatus::Unsaved,
            (false, _) => SaveStatus::Saved,
        }
    }

    pub fn stats(&self) -> AutoSaveStats {
        self.shared.state().stats.clone()
    }

    /// Encoded bytes of the last failed save, kept until a save succeeds.
    pub fn backup(&self) -> Option<Vec<u8>> {
        self.shared.state().backup.clone()
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        self.shared.state().cancel_timer();
    }
}
