//! Bounded per-node receive ring

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::frame::CanFrame;

/// Receive buffer depth of a FlexCAN node
pub const RX_BUFFER_SIZE: usize = 16;

#[derive(Debug)]
struct Ring {
    storage: Box<[CanFrame]>,
    head: usize,
    tail: usize,
}

/// Circular receive buffer guarded by a mutex.
///
/// `head == tail` means empty. The writer never moves `tail`, so once `C`
/// frames are pending the ring reads as empty again and the next enqueue
/// overwrites the oldest slot. Useful occupancy is therefore `C - 1`; there
/// is no overrun flag.
#[derive(Debug)]
pub struct RxQueue {
    ring: Mutex<Ring>,
}

impl RxQueue {
    pub fn new() -> Self {
        Self::with_capacity(RX_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Mutex::new(Ring {
                storage: vec![CanFrame::default(); capacity].into_boxed_slice(),
                head: 0,
                tail: 0,
            }),
        }
    }

    // Indices and Copy frames only: a poisoned ring is still consistent.
    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `frame` at the write index and advance it. Blocks on the lock.
    pub fn enqueue(&self, frame: CanFrame) {
        let mut ring = self.lock();
        let head = ring.head;
        ring.storage[head] = frame;
        ring.head = (head + 1) % ring.storage.len();
        if ring.head == ring.tail {
            tracing::warn!(
                capacity = ring.storage.len(),
                "rx buffer wrapped onto unread frames; pending frames are lost"
            );
        }
    }

    /// Take the oldest pending frame, or `None` when the ring reads empty.
    pub fn dequeue(&self) -> Option<CanFrame> {
        let mut ring = self.lock();
        if ring.head == ring.tail {
            return None;
        }
        let frame = ring.storage[ring.tail];
        ring.tail = (ring.tail + 1) % ring.storage.len();
        Some(frame)
    }

    /// Number of frames a reader would currently get before seeing empty.
    pub fn len(&self) -> usize {
        let ring = self.lock();
        let capacity = ring.storage.len();
        (ring.head + capacity - ring.tail) % capacity
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().storage.len()
    }
}

impl Default for RxQueue {
    fn default() -> Self {
        Self::new()
    }
}
