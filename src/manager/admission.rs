//! Concurrency gate whose bound can change while permits are out.
//!
//! Slots are permits of a `tokio::sync::Semaphore`. Raising the limit adds
//! permits. Lowering it forgets the idle permits it can take right away and
//! records the rest as debt, which permits returned later pay off instead of
//! going back to the semaphore. Outstanding permits are never revoked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

struct Bounds {
    limit: usize,
    /// Permits still to be retired after a shrink
    debt: usize,
}

pub(crate) struct AdmissionControl {
    semaphore: Arc<Semaphore>,
    bounds: Mutex<Bounds>,
    active: AtomicUsize,
}

/// Held for as long as a task occupies a slot
pub(crate) struct AdmissionPermit {
    permit: Option<OwnedSemaphorePermit>,
    gate: Arc<AdmissionControl>,
}

impl AdmissionControl {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            bounds: Mutex::new(Bounds { limit, debt: 0 }),
            active: AtomicUsize::new(0),
        }
    }

    fn bounds(&self) -> std::sync::MutexGuard<'_, Bounds> {
        self.bounds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for a free slot; fails only if the semaphore was closed
    pub(crate) async fn acquire(self: &Arc<Self>) -> Result<AdmissionPermit, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(AdmissionPermit {
            permit: Some(permit),
            gate: Arc::clone(self),
        })
    }

    /// Replace the bound; returns the previous one
    pub(crate) fn set_limit(&self, limit: usize) -> usize {
        let mut bounds = self.bounds();
        let previous = bounds.limit;
        bounds.limit = limit;

        if limit > previous {
            let mut grow = limit - previous;
            let repaid = grow.min(bounds.debt);
            bounds.debt -= repaid;
            grow -= repaid;
            if grow > 0 {
                self.semaphore.add_permits(grow);
            }
        } else {
            let mut shrink = previous - limit;
            while shrink > 0 {
                match self.semaphore.try_acquire() {
                    Ok(idle) => {
                        idle.forget();
                        shrink -= 1;
                    }
                    Err(_) => break,
                }
            }
            bounds.debt += shrink;
        }

        previous
    }

    pub(crate) fn limit(&self) -> usize {
        self.bounds().limit
    }

    /// Permits currently held
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.active.fetch_sub(1, Ordering::SeqCst);
        let Some(permit) = self.permit.take() else {
            return;
        };

        let mut bounds = self.gate.bounds();
        if bounds.debt > 0 {
            bounds.debt -= 1;
            permit.forget();
        }
        // Otherwise the permit returns to the semaphore when dropped here
    }
}
