//! Sandbox slot pool
//!
//! The pool is the single synchronization point shared across concurrent
//! requests: it bounds how many sandboxes run simultaneously and hands
//! out the small integer ids that container names are derived from.
//!
//! Acquisition blocks (it does not reject) until a slot frees up, so a
//! saturated pool applies backpressure instead of failing requests. The
//! underlying semaphore is fair, which keeps admission starvation-free.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// The pool's semaphore was closed. Does not happen in normal operation;
/// the pool never closes its own semaphore.
#[derive(Debug, Error)]
#[error("slot pool is closed")]
pub struct PoolClosed;

/// Bounded pool of sandbox slots with ids `1..=capacity`.
///
/// Slots are recycled, never destroyed: an id returns to the free set
/// when its [`SlotGuard`] drops, on every exit path including panics.
#[derive(Debug)]
pub struct SlotPool {
    capacity: u32,
    semaphore: Arc<Semaphore>,
    free: Arc<Mutex<Vec<u32>>>,
}

impl SlotPool {
    /// Create a pool with `capacity` slots
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            free: Arc::new(Mutex::new((1..=capacity).collect())),
        }
    }

    /// Acquire a slot, waiting until one is available.
    ///
    /// The returned guard releases the slot when dropped.
    pub async fn acquire(&self) -> Result<SlotGuard, PoolClosed> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolClosed)?;

        let id = {
            let mut free = lock_free_list(&self.free);
            // A held permit guarantees at least one free id
            free.pop().expect("slot free list out of sync with permits")
        };

        debug!(id, available = self.available(), "acquired sandbox slot");

        Ok(SlotGuard {
            id,
            capacity: self.capacity,
            free: Arc::clone(&self.free),
            _permit: permit,
        })
    }

    /// Release a slot explicitly. Equivalent to dropping the guard.
    pub fn release(&self, guard: SlotGuard) {
        drop(guard);
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Total number of slots in the pool
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// One acquired sandbox slot.
///
/// Holds the concurrency permit for its lifetime; dropping the guard
/// returns the id to the free set and wakes one waiting acquirer.
#[derive(Debug)]
pub struct SlotGuard {
    id: u32,
    capacity: u32,
    free: Arc<Mutex<Vec<u32>>>,
    _permit: OwnedSemaphorePermit,
}

impl SlotGuard {
    /// The slot id, in `1..=capacity`. Container names are derived from
    /// this, so it is unique among concurrently held guards.
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        return_id(&self.free, self.capacity, self.id);
    }
}

/// Return an id to the free set.
///
/// Ids outside the pool range or already free are ignored with a
/// warning: a malformed or externally constructed id must never corrupt
/// the free set.
fn return_id(free: &Mutex<Vec<u32>>, capacity: u32, id: u32) {
    if id == 0 || id > capacity {
        warn!(id, capacity, "ignoring release of id not in pool");
        return;
    }
    let mut free = lock_free_list(free);
    if free.contains(&id) {
        warn!(id, "ignoring release of id already free");
        return;
    }
    free.push(id);
    debug!(id, "released sandbox slot");
}

/// Lock the free list, recovering from a poisoned mutex. The list holds
/// plain integers, so the state is valid even if a holder panicked.
fn lock_free_list(free: &Mutex<Vec<u32>>) -> std::sync::MutexGuard<'_, Vec<u32>> {
    free.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
