use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded, non-blocking admission gate for concurrent units of work.
///
/// The limiter is a counting semaphore sized to the endpoint's
/// `maxRunningReq`. [`try_admit`](Self::try_admit) never waits: when every slot
/// is taken the attempt is denied on the spot and the caller is expected to
/// skip that unit of work rather than queue it.
///
/// A granted slot is represented by an [`Admission`]. Dropping it releases the
/// slot, so release happens exactly once on every exit path of the admitted
/// work, panics included.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// One occupied limiter slot. Released on drop.
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        // The semaphore reserves its top bits for flags.
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Claims a slot if one is free, otherwise returns `None` immediately.
    pub fn try_admit(&self) -> Option<Admission> {
        self.slots
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| Admission { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }
}
