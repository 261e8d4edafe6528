//! Save backends: where encoded notes go.
//!
//! ```text
//! AutoSaveScheduler ── bytes ──► SaveBackend::save
//!                                   ├── MemoryBackend  (tests, previews)
//!                                   └── FileBackend    (lz4 + atomic rename)
//! ```
//!
//! A backend sees at most one `save` at a time per scheduler. It owns no
//! retry policy: a failure is reported and the scheduler decides.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
    #[error("Save rejected: {0}")]
    Rejected(String),
}

/// Persists one encoded document snapshot.
pub trait SaveBackend: Send + Sync {
    fn save<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<(), SaveError>>;
}

/// In-memory backend with optional latency and failure injection.
#[derive(Default)]
pub struct MemoryBackend {
    saves: Mutex<Vec<Vec<u8>>>,
    delay: Duration,
    fail_next: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save takes `delay` before completing.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Fail the next `count` saves.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.lock().len()
    }

    pub fn saves(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    pub fn last_saved(&self) -> Option<Vec<u8>> {
        self.lock().last().cloned()
    }

    /// Highest number of saves that were ever running at once.
    pub fn max_concurrent_saves(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl SaveBackend for MemoryBackend {
    fn save<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<(), SaveError>> {
        Box::pin(async move {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let result = if self.take_failure() {
                Err(SaveError::Rejected("injected failure".to_string()))
            } else {
                self.lock().push(bytes.to_vec());
                Ok(())
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

/// File backend configuration.
#[derive(Debug, Clone)]
pub struct FileBackendConfig {
    /// Snapshot file path
    pub path: PathBuf,
    /// LZ4-compress snapshots (default: true)
    pub compress: bool,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("scribe_note.bin"),
            compress: true,
        }
    }
}

impl FileBackendConfig {
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            compress: true,
        }
    }
}

/// Writes each snapshot to a sibling temp file, then renames it over the
/// target, so readers see either the old or the new snapshot.
pub struct FileBackend {
    config: FileBackendConfig,
}

impl FileBackend {
    pub fn new(config: FileBackendConfig) -> Self {
        Self { config }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.config.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .config
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.config.path.with_file_name(name)
    }

    /// Last saved snapshot, or `None` if nothing was saved yet.
    pub async fn load(&self) -> Result<Option<Vec<u8>>, SaveError> {
        let stored = match tokio::fs::read(&self.config.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !self.config.compress {
            return Ok(Some(stored));
        }
        lz4_flex::decompress_size_prepended(&stored)
            .map(Some)
            .map_err(|e| SaveError::Corrupt(e.to_string()))
    }
}

impl SaveBackend for FileBackend {
    fn save<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<(), SaveError>> {
        Box::pin(async move {
            let payload = if self.config.compress {
                lz4_flex::compress_prepend_size(bytes)
            } else {
                bytes.to_vec()
            };
            if let Some(parent) = self.config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let temp = self.temp_path();
            tokio::fs::write(&temp, &payload).await?;
            tokio::fs::rename(&temp, &self.config.path).await?;
            log::debug!(
                "Wrote {} bytes ({} raw) to {}",
                payload.len(),
                bytes.len(),
                self.config.path.display()
            );
            Ok(())
        })
    }
}
