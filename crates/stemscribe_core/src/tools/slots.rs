//! Counting limit on concurrently running external tools.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Shared pool of tool slots.
///
/// Cloning shares the same pool. `acquire` blocks until a slot is free.
#[derive(Clone)]
pub struct ToolSlots {
    inner: Arc<SlotsInner>,
}

struct SlotsInner {
    available: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
}

impl ToolSlots {
    /// Create a pool with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(SlotsInner {
                available: Mutex::new(capacity),
                freed: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Block until a slot is free and take it.
    pub fn acquire(&self) -> SlotPermit {
        let mut available = self.inner.available.lock();
        while *available == 0 {
            self.inner.freed.wait(&mut available);
        }
        *available -= 1;
        SlotPermit {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Slots free right now.
    pub fn available(&self) -> usize {
        *self.inner.available.lock()
    }
}

/// A held slot; released on drop.
pub struct SlotPermit {
    inner: Arc<SlotsInner>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        let mut available = self.inner.available.lock();
        *available += 1;
        self.inner.freed.notify_one();
    }
}
