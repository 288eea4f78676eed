//! Single-slot result handoff between a worker context and the render loop.
//!
//! Workers `send` from any thread; the render loop `take`s once per frame.
//! The slot holds at most one value and a newer value replaces an undrained
//! older one (last writer wins).

use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    sent: u64,
    overwritten: u64,
}

/// Receiving side, owned by the render loop.
#[derive(Debug)]
pub struct Handoff<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

/// Sending side, handed to worker contexts.
#[derive(Debug)]
pub struct HandoffSender<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value: None,
                sent: 0,
                overwritten: 0,
            })),
        }
    }
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> HandoffSender<T> {
        HandoffSender {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Removes the pending value, if any.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().value.take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().value.is_some()
    }

    /// Total values sent through this handoff.
    pub fn sent_count(&self) -> u64 {
        self.slot.lock().sent
    }

    /// Values that were replaced before the render loop drained them.
    pub fn overwritten_count(&self) -> u64 {
        self.slot.lock().overwritten
    }
}

impl<T> HandoffSender<T> {
    /// Publishes `value`. Returns `true` if an undrained value was replaced.
    pub fn send(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        slot.sent += 1;
        let replaced = slot.value.replace(value).is_some();
        if replaced {
            slot.overwritten += 1;
        }
        replaced
    }
}
