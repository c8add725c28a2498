//! Shared progress counters for one batch run.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Progress of a batch, updated concurrently by every video task.
///
/// Readers may call [`BatchStatus::snapshot`] at any time, during or after a
/// run. At completion `processed == downloaded + failed`.
#[derive(Debug, Default)]
pub struct BatchStatus {
    total: AtomicUsize,
    processed: AtomicUsize,
    downloaded: AtomicUsize,
    failed: AtomicUsize,
    running: AtomicBool,
    start_time: Mutex<Option<SystemTime>>,
}

impl BatchStatus {
    /// Creates an idle status with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of videos counted for this run.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Videos whose task has finished.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Videos that ended with a subtitle.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Videos that ended without a subtitle.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns true while a run is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// When the current (or last) run started.
    #[must_use]
    pub fn start_time(&self) -> Option<SystemTime> {
        *self
            .start_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Captures all counters at once.
    #[must_use]
    pub fn snapshot(&self) -> BatchSnapshot {
        let start_time = self.start_time();
        BatchSnapshot {
            total: self.total(),
            processed: self.processed(),
            downloaded: self.downloaded(),
            failed: self.failed(),
            running: self.is_running(),
            started_at_unix_secs: start_time
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
            elapsed_secs: start_time
                .and_then(|t| t.elapsed().ok())
                .map(|d| d.as_secs_f64()),
        }
    }

    /// Resets counters, fixes `total` and marks the run as started.
    pub(crate) fn begin(&self, total: usize) {
        self.processed.store(0, Ordering::SeqCst);
        self.downloaded.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
        *self
            .start_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(SystemTime::now());
        self.running.store(true, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn record_downloaded(&self) {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Point-in-time, serializable view of a [`BatchStatus`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSnapshot {
    /// Videos counted for this run.
    pub total: usize,
    /// Videos finished.
    pub processed: usize,
    /// Videos that ended with a subtitle.
    pub downloaded: usize,
    /// Videos that ended without one.
    pub failed: usize,
    /// Whether the run is still in progress.
    pub running: bool,
    /// Start of the run, seconds since the Unix epoch.
    pub started_at_unix_secs: Option<u64>,
    /// Seconds since the run started.
    pub elapsed_secs: Option<f64>,
}

impl BatchSnapshot {
    /// Videos not yet finished.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }

    /// Elapsed time as a `Duration`, if the run has started.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_secs.map(Duration::from_secs_f64)
    }
}
