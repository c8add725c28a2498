//! Global admission control for outbound catalog requests.
//!
//! The [`ConcurrencyGate`] caps how many requests are in flight at once
//! across every caller sharing it, regardless of how many batch workers are
//! running. Permits are RAII guards: dropping one frees the slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{instrument, trace};

/// Default number of simultaneous catalog requests.
pub const DEFAULT_GATE_CAPACITY: usize = 3;

/// Counting semaphore with in-flight instrumentation.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<GateCounters>,
}

#[derive(Debug, Default)]
struct GateCounters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Slot held while a request is in flight.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<GateCounters>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Error returned when the gate has been closed.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("concurrency gate closed")]
pub struct GateClosed;

impl ConcurrencyGate {
    /// Creates a gate admitting `capacity` holders at a time (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Arc::new(GateCounters::default()),
        }
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held simultaneously since creation.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Waits for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`GateClosed`] if the gate was closed while waiting.
    #[instrument(level = "trace", skip(self), fields(capacity = self.capacity))]
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;

        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);
        trace!(in_flight = now, "gate permit acquired");

        Ok(GatePermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        })
    }

    /// Closes the gate; pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_GATE_CAPACITY)
    }
}
