//! Event queue and simulation clock for the S32K358 simulator

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

/// Simulation event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEventType {
    /// Poll the firmware task with this index
    TaskWake(usize),
    /// Offer the next scripted byte to the console receiver
    SerialRx,
}

/// Simulation event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimEvent {
    pub timestamp: Duration,
    pub event_type: SimEventType,
    seq: u64,
}

// Reversed so the max-heap pops the earliest event; equal timestamps pop in
// insertion order.
impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Event queue for simulation
#[derive(Debug, Default)]
pub struct SimEventQueue {
    queue: BinaryHeap<SimEvent>,
    next_seq: u64,
}

impl SimEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp: Duration, event_type: SimEventType) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(SimEvent {
            timestamp,
            event_type,
            seq,
        });
    }

    pub fn pop(&mut self) -> Option<SimEvent> {
        self.queue.pop()
    }

    /// Timestamp of the next event without removing it.
    pub fn peek_time(&self) -> Option<Duration> {
        self.queue.peek().map(|e| e.timestamp)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Simulation clock.
///
/// Clones share the same time, so observers such as the trace tap can stamp
/// records with the time the loop is at. Microsecond resolution.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_us: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        Duration::from_micros(self.now_us.load(AtomicOrdering::Acquire))
    }

    /// Move the clock to `time`. The clock never runs backwards.
    pub fn advance_to(&self, time: Duration) {
        let us = u64::try_from(time.as_micros()).unwrap_or(u64::MAX);
        self.now_us.fetch_max(us, AtomicOrdering::AcqRel);
    }

    pub fn advance(&self, dt: Duration) {
        self.advance_to(self.now() + dt);
    }
}
