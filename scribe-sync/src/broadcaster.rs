//! Debounced fan-out of `FormatState` to toolbar observers.
//!
//! ```text
//! publish(s1) ─┐
//! publish(s2) ─┼─ restarts a 50ms timer ──► deliver(s3) ──► subscribers
//! publish(s3) ─┘                              │
//!                                             └─ skipped if s3 == last delivered
//! ```
//!
//! Only the latest pending state survives a burst. `force_flush` delivers it
//! synchronously and cancels the timer. When several editors share one
//! toolbar, exactly one provider is active; publishes from any other provider
//! are ignored and switching providers delivers the new provider's state at
//! once.
//!
//! Every subscriber gets its own unbounded channel. Deliveries are already
//! rate-limited by the debounce and deduplicated, so the queues stay short.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use scribe_core::FormatState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::SessionConfig;

/// Identifies an editor that can drive the shared toolbar.
pub type ProviderId = Uuid;

/// Statistics for monitoring the broadcaster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// States accepted by `publish`.
    pub published: u64,
    /// States handed to subscribers.
    pub delivered: u64,
    /// Flushes dropped because the state equalled the last delivery.
    pub skipped: u64,
    /// Forced flushes, provider switches included.
    pub flushes: u64,
    /// Publishes from an inactive provider.
    pub ignored: u64,
    pub subscribers: usize,
}

/// Lock-free counters; read via `snapshot`.
#[derive(Default)]
struct AtomicBroadcastStats {
    published: AtomicU64,
    delivered: AtomicU64,
    skipped: AtomicU64,
    flushes: AtomicU64,
    ignored: AtomicU64,
}

impl AtomicBroadcastStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, subscribers: usize) -> BroadcastStats {
        BroadcastStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            subscribers,
        }
    }
}

#[derive(Default)]
struct Inner {
    pending: Option<FormatState>,
    last_delivered: Option<FormatState>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is restarted or cancelled; a firing timer
    /// whose generation is stale does nothing.
    generation: u64,
    subscribers: Vec<mpsc::UnboundedSender<FormatState>>,
    active_provider: Option<ProviderId>,
}

impl Inner {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation += 1;
    }
}

struct Shared {
    debounce: Duration,
    inner: Mutex<Inner>,
    stats: AtomicBroadcastStats,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand `state` to every live subscriber unless it repeats the last
    /// delivery. Closed subscribers are pruned here.
    fn deliver(&self, inner: &mut Inner, state: FormatState) -> bool {
        if inner.last_delivered == Some(state) {
            AtomicBroadcastStats::bump(&self.stats.skipped);
            log::trace!("Format state unchanged; delivery skipped");
            return false;
        }
        inner.subscribers.retain(|tx| tx.send(state).is_ok());
        inner.last_delivered = Some(state);
        AtomicBroadcastStats::bump(&self.stats.delivered);
        log::trace!(
            "Delivered format state to {} subscriber(s): {:?}",
            inner.subscribers.len(),
            state.formats()
        );
        true
    }

    fn fire(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        inner.timer = None;
        if let Some(state) = inner.pending.take() {
            self.deliver(&mut inner, state);
        }
    }
}

/// Debounced, deduplicated format-state publisher. Cheap to clone; clones
/// share the same subscribers and timer.
#[derive(Clone)]
pub struct FormatStateBroadcaster {
    shared: Arc<Shared>,
}

impl FormatStateBroadcaster {
    pub fn new(debounce: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                debounce,
                inner: Mutex::new(Inner::default()),
                stats: AtomicBroadcastStats::default(),
            }),
        }
    }

    pub fn with_config(config: &SessionConfig) -> Self {
        Self::new(config.format_debounce)
    }

    pub fn debounce(&self) -> Duration {
        self.shared.debounce
    }

    /// New observer. It immediately receives the last delivered state, if
    /// any, so a toolbar created late is never blank.
    pub fn subscribe(&self) -> FormatStateStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.shared.lock();
        if let Some(last) = inner.last_delivered {
            let _ = tx.send(last);
        }
        inner.subscribers.push(tx);
        FormatStateStream { rx }
    }

    /// Replace the pending state and restart the debounce timer.
    pub fn publish(&self, state: FormatState) {
        let mut inner = self.shared.lock();
        self.publish_locked(&mut inner, state);
    }

    /// `publish` on behalf of `provider`. Ignored unless `provider` is the
    /// active one. Returns whether the state was accepted.
    pub fn publish_from(&self, provider: ProviderId, state: FormatState) -> bool {
        let mut inner = self.shared.lock();
        if inner.active_provider != Some(provider) {
            AtomicBroadcastStats::bump(&self.shared.stats.ignored);
            log::trace!("Ignoring format state from inactive provider {provider}");
            return false;
        }
        self.publish_locked(&mut inner, state);
        true
    }

    fn publish_locked(&self, inner: &mut Inner, state: FormatState) {
        AtomicBroadcastStats::bump(&self.shared.stats.published);
        inner.pending = Some(state);
        inner.cancel_timer();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // No runtime to time the window: degrade to immediate delivery.
            log::warn!("No tokio runtime; delivering format state without debounce");
            if let Some(state) = inner.pending.take() {
                self.shared.deliver(inner, state);
            }
            return;
        };

        let generation = inner.generation;
        let shared = Arc::clone(&self.shared);
        inner.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(shared.debounce).await;
            shared.fire(generation);
        }));
    }

    /// Deliver the pending state now and cancel the timer. Without a pending
    /// state this only cancels.
    pub fn force_flush(&self) {
        let mut inner = self.shared.lock();
        inner.cancel_timer();
        AtomicBroadcastStats::bump(&self.shared.stats.flushes);
        if let Some(state) = inner.pending.take() {
            self.shared.deliver(&mut inner, state);
        }
    }

    /// Make `provider` the one editor whose states reach observers. Any
    /// pending state from the previous provider is dropped and `current` is
    /// delivered immediately. Returns the previous provider.
    pub fn set_active_provider(&self, provider: ProviderId, current: FormatState) -> Option<ProviderId> {
        let mut inner = self.shared.lock();
        inner.cancel_timer();
        inner.pending = None;
        let previous = inner.active_provider.replace(provider);
        AtomicBroadcastStats::bump(&self.shared.stats.flushes);
        if previous != Some(provider) {
            log::debug!("Active format provider: {previous:?} -> {provider}");
        }
        self.shared.deliver(&mut inner, current);
        previous
    }

    /// Give up the toolbar. Only the active provider can resign; its pending
    /// state is discarded.
    pub fn resign_active_provider(&self, provider: ProviderId) -> bool {
        let mut inner = self.shared.lock();
        if inner.active_provider != Some(provider) {
            return false;
        }
        inner.cancel_timer();
        inner.pending = None;
        inner.active_provider = None;
        log::debug!("Format provider {provider} resigned");
        true
    }

    pub fn active_provider(&self) -> Option<ProviderId> {
        self.shared.lock().active_provider
    }

    pub fn last_delivered(&self) -> Option<FormatState> {
        self.shared.lock().last_delivered
    }

    pub fn has_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    pub fn stats(&self) -> BroadcastStats {
        let subscribers = {
            let mut inner = self.shared.lock();
            inner.subscribers.retain(|tx| !tx.is_closed());
            inner.subscribers.len()
        };
        self.shared.stats.snapshot(subscribers)
    }
}

impl Default for FormatStateBroadcaster {
    fn default() -> Self {
        Self::with_config(&SessionConfig::default())
    }
}

/// Receiving side of `FormatStateBroadcaster::subscribe`.
pub struct FormatStateStream {
    rx: mpsc::UnboundedReceiver<FormatState>,
}

impl FormatStateStream {
    /// Wait for the next delivery. `None` once every broadcaster handle is gone.
    pub async fn recv(&mut self) -> Option<FormatState> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<FormatState> {
        self.rx.try_recv().ok()
    }

    /// Everything delivered so far, oldest first.
    pub fn drain(&mut self) -> Vec<FormatState> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Stream for FormatStateStream {
    type Item = FormatState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<FormatState>> {
        self.rx.poll_recv(cx)
    }
}
