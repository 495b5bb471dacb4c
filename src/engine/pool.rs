// src/engine/pool.rs

//! Admission gate bounding how many tasks are in flight at once.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Upper bound for the CPU-derived default worker count.
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// `2 * available CPUs`, clamped to `1..=MAX_DEFAULT_WORKERS`.
pub fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 2).clamp(1, MAX_DEFAULT_WORKERS)
}

/// Counting gate of `size` slots shared by every worker of one pass.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    slots: Arc<Semaphore>,
    size: usize,
}

impl AdmissionGate {
    /// A gate of at least one slot.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for a slot, or give up with `None` once `cancel` fires.
    ///
    /// The slot is released when the returned permit is dropped.
    pub async fn admit(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        if cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&self.slots).acquire_owned() => permit.ok(),
        }
    }
}
