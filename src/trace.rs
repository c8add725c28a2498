//! Append-only, human-readable trace of one video's resolution.
//!
//! A [`TraceLog`] is shared by reference through every layer a resolution
//! passes (chain, provider, safe-fetch), so it uses interior mutability. Each
//! entry is mirrored to `tracing` at debug level.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// Ordered log of resolution steps.
#[derive(Debug, Default)]
pub struct TraceLog {
    entries: Mutex<Vec<String>>,
}

impl TraceLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!(target: "subgrab::trace", "{entry}");
        self.lock().push(entry);
    }

    /// Number of entries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Returns true if any entry contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lock().iter().any(|entry| entry.contains(needle))
    }

    /// Consumes the log and returns its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<String> {
        self.entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
